use std::sync::Arc;

use crate::agents::FileUploadAgent;
use crate::config::Config;
use crate::documents::{DocumentProcessor, PageRasterizer, PopplerRasterizer};
use crate::llm::{GroqAdapter, LLMAdapter};
use crate::middleware::{AccessGate, JwtGate};
use crate::parser::LlamaCloudParser;
use crate::storage::UploadDir;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub upload_dir: UploadDir,
    pub processor: Arc<DocumentProcessor>,
    pub agent: Arc<FileUploadAgent>,
    pub access_gate: Arc<dyn AccessGate>,
}

impl AppState {
    /// Production wiring: poppler for rasterization, Groq for completions.
    pub fn new(config: Config, upload_dir: UploadDir) -> anyhow::Result<Self> {
        let rasterizer = Arc::new(PopplerRasterizer::new(
            config.upload.rasterize_dpi,
            config.upload.rasterize_timeout,
        ));
        Self::with_rasterizer(config, upload_dir, rasterizer)
    }

    pub fn with_rasterizer(
        config: Config,
        upload_dir: UploadDir,
        rasterizer: Arc<dyn PageRasterizer>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.server.http_timeout)
            .build()?;

        let llm: Arc<dyn LLMAdapter> = Arc::new(GroqAdapter::new(client.clone(), &config.llm));
        let parser = Arc::new(LlamaCloudParser::new(client, &config.parser));
        let processor = Arc::new(DocumentProcessor::new(
            upload_dir.clone(),
            rasterizer,
            parser,
            &config.upload,
        ));
        let agent = Arc::new(FileUploadAgent::new(llm, &config.llm));
        let access_gate = Arc::new(JwtGate::new(config.auth.jwt_secret.as_deref()));

        Ok(Self {
            config: Arc::new(config),
            upload_dir,
            processor,
            agent,
            access_gate,
        })
    }
}

// API Request/Response types

/// Success envelope for `POST /api/process`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub output: String,
}

impl ProcessResponse {
    pub fn ok(output: String) -> Self {
        Self {
            success: true,
            output,
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
