//! LlamaCloud Parsing Client
//!
//! Converts a PDF to markdown through the hosted submit-then-poll API:
//!
//! 1. `POST {base}/upload` (multipart `file`) returns a job id
//! 2. `GET {base}/job/{id}/result/markdown` is polled until it answers 200
//!
//! While the job runs, the result endpoint answers 400 with a "not completed"
//! detail. Any other 400 or non-2xx status is terminal.

use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::config::ParserConfig;
use crate::types::{AppError, AppResult};
use crate::utils::retry::{poll_until, PollPolicy, PollStatus};

const SERVICE: &str = "LlamaCloud";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MarkdownResponse {
    #[serde(default)]
    markdown: String,
}

/// Body of a non-200 result response.
#[derive(Debug, Deserialize)]
struct ResultErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

pub struct LlamaCloudParser {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    policy: PollPolicy,
}

impl LlamaCloudParser {
    pub fn new(client: Client, config: &ParserConfig) -> Self {
        Self {
            client,
            api_key: config.llama_cloud_api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            policy: PollPolicy::new(config.poll_interval, config.max_attempts),
        }
    }

    fn api_key(&self) -> AppResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Configuration("LLAMA_CLOUD_API_KEY is not set".to_string()))
    }

    /// Upload `path` and wait for its markdown.
    pub async fn parse(&self, path: &Path, file_name: &str, media_type: &str) -> AppResult<String> {
        let job_id = self.upload(path, file_name, media_type).await?;
        self.poll_markdown(&job_id).await
    }

    /// Submit a file for parsing; returns the job id.
    pub async fn upload(&self, path: &Path, file_name: &str, media_type: &str) -> AppResult<String> {
        let api_key = self.api_key()?;
        let bytes = tokio::fs::read(path).await?;
        let size = bytes.len();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(media_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .bearer_auth(api_key)
            .header(header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let job: UploadResponse = response.json().await?;
        info!(
            job_id = %job.id,
            status = ?job.status,
            size,
            max_wait_secs = self.policy.ceiling().as_secs(),
            "Submitted document for parsing"
        );
        Ok(job.id)
    }

    /// Poll a job until its markdown is ready, it fails, or the policy runs out.
    pub async fn poll_markdown(&self, job_id: &str) -> AppResult<String> {
        let api_key = self.api_key()?;
        let url = format!("{}/job/{}/result/markdown", self.base_url, job_id);

        let markdown = poll_until(&self.policy, "document parsing", |attempt| {
            self.fetch_markdown(&url, api_key, attempt)
        })
        .await?;

        info!(job_id, chars = markdown.chars().count(), "Parsing job complete");
        Ok(markdown)
    }

    /// One poll of the result endpoint.
    async fn fetch_markdown(
        &self,
        url: &str,
        api_key: &str,
        attempt: u32,
    ) -> AppResult<PollStatus<String>> {
        let response = self
            .client
            .get(url)
            .bearer_auth(api_key)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();

        if status.is_success() {
            let result: MarkdownResponse = response.json().await?;
            if result.markdown.trim().is_empty() {
                return Err(AppError::Upstream {
                    service: SERVICE,
                    status: status.as_u16(),
                    body: "parsing finished without any markdown".to_string(),
                });
            }
            return Ok(PollStatus::Ready(result.markdown));
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST && is_pending(&body) {
            debug!(attempt, "Parsing job not complete yet");
            return Ok(PollStatus::Pending);
        }

        Err(AppError::Upstream {
            service: SERVICE,
            status: status.as_u16(),
            body,
        })
    }
}

/// The result endpoint's "job still running" marker.
fn is_pending(body: &str) -> bool {
    let Ok(parsed) = serde_json::from_str::<ResultErrorBody>(body) else {
        return false;
    };

    let detail_pending = parsed
        .detail
        .is_some_and(|d| d.to_ascii_lowercase().contains("not completed"));
    let status_pending = parsed
        .status
        .is_some_and(|s| s.eq_ignore_ascii_case("pending"));

    detail_pending || status_pending
}
