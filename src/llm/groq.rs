// Groq adapter (OpenAI-compatible chat completions)
// API Reference: https://console.groq.com/docs/api-reference#chat-create
//
// Vision models take images as `image_url` parts; base64 images are sent as
// data URLs.

use crate::config::LLMConfig;
use crate::llm::provider::LLMAdapter;
use crate::types::{
    AppError, AppResult, ContentPart, LLMMessage, LLMRequest, LLMResponse, MessageContent,
    TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const SERVICE: &str = "Groq";

pub struct GroqAdapter {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

// Request types for the chat completions API
#[derive(Serialize)]
struct GroqChatRequest {
    model: String,
    messages: Vec<GroqMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Serialize)]
struct GroqMessage {
    role: String,
    content: GroqMessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GroqMessageContent {
    Text(String),
    Multimodal(Vec<GroqContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum GroqContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: GroqImageUrl },
}

#[derive(Serialize)]
struct GroqImageUrl {
    url: String,
}

// Response types
#[derive(Deserialize)]
struct GroqChatResponse {
    #[serde(default)]
    choices: Vec<GroqChoice>,
    #[serde(default)]
    usage: Option<GroqUsage>,
}

#[derive(Deserialize)]
struct GroqChoice {
    #[serde(default)]
    message: Option<GroqResponseMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GroqResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct GroqUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct GroqErrorResponse {
    error: GroqError,
}

#[derive(Deserialize)]
struct GroqError {
    message: String,
}

impl GroqAdapter {
    pub fn new(client: Client, config: &LLMConfig) -> Self {
        Self {
            client,
            api_key: config.groq_api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Convert internal message format to the wire format
    fn convert_message(msg: &LLMMessage) -> GroqMessage {
        let content = match &msg.content {
            MessageContent::Text(text) => GroqMessageContent::Text(text.clone()),
            MessageContent::Multimodal(parts) => GroqMessageContent::Multimodal(
                parts
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text { text } => GroqContentPart::Text { text: text.clone() },
                        ContentPart::ImageBase64 { base64, media_type } => {
                            GroqContentPart::ImageUrl {
                                image_url: GroqImageUrl {
                                    url: format!("data:{};base64,{}", media_type, base64),
                                },
                            }
                        }
                    })
                    .collect(),
            ),
        };

        GroqMessage {
            role: msg.role.clone(),
            content,
        }
    }
}

#[async_trait]
impl LLMAdapter for GroqAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Configuration("GROQ_API_KEY is not set".to_string()))?;

        let url = format!("{}/chat/completions", self.base_url);

        let groq_request = GroqChatRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            has_images = request.messages.iter().any(|m| m.content.has_images()),
            "Sending chat completion"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&groq_request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<GroqErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);

            return Err(AppError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let groq_response: GroqChatResponse = response.json().await?;

        let choice = groq_response
            .choices
            .into_iter()
            .next()
            .ok_or(AppError::UpstreamEmptyResponse)?;

        let content = choice
            .message
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AppError::UpstreamEmptyResponse)?;

        let usage = groq_response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        info!(
            model = %request.model,
            total_tokens = usage.as_ref().map(|u| u.total_tokens),
            "Chat completion received"
        );

        Ok(LLMResponse {
            content,
            finish_reason: choice.finish_reason,
            usage,
        })
    }

    fn name(&self) -> &'static str {
        "groq"
    }
}
