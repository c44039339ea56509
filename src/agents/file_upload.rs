//! File Upload Agent
//!
//! Answers a user prompt about one prepared upload with a single completion
//! call. Images go to the vision model inline; text (local or hosted
//! extraction) is appended to the prompt.

use std::sync::Arc;
use tracing::info;

use crate::config::LLMConfig;
use crate::documents::PreparedContent;
use crate::llm::LLMAdapter;
use crate::types::{AppResult, LLMMessage, LLMRequest};

const SYSTEM_INSTRUCTION: &str = "You are a document assistant. Answer the user's request using only the attached file. If the file does not contain the information, say so plainly.";

pub struct FileUploadAgent {
    llm: Arc<dyn LLMAdapter>,
    model: String,
    max_tokens: u32,
}

impl FileUploadAgent {
    pub fn new(llm: Arc<dyn LLMAdapter>, config: &LLMConfig) -> Self {
        Self {
            llm,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    /// Build the completion request for `prompt` over `content`.
    pub fn build_request(&self, prompt: &str, content: &PreparedContent) -> LLMRequest {
        let user = match content {
            PreparedContent::Image { base64, media_type } => {
                LLMMessage::user_with_base64_image(prompt, base64.clone(), media_type.clone())
            }
            PreparedContent::Text(text) => {
                LLMMessage::user(format!("{}\n\nDocument content:\n{}", prompt, text))
            }
        };

        LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::system(SYSTEM_INSTRUCTION), user],
            max_tokens: Some(self.max_tokens),
            temperature: Some(0.0),
        }
    }

    /// Run the prompt against the prepared content and return the model's text.
    pub async fn run(&self, prompt: &str, content: &PreparedContent) -> AppResult<String> {
        let request = self.build_request(prompt, content);
        let response = self.llm.create_chat_completion(&request).await?;

        info!(
            provider = self.llm.name(),
            output_len = response.content.len(),
            finish_reason = ?response.finish_reason,
            "Completion finished"
        );
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppError, LLMResponse, MessageContent};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingLLM {
        reply: Option<String>,
        seen: Mutex<Vec<LLMRequest>>,
    }

    #[async_trait]
    impl LLMAdapter for RecordingLLM {
        async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Some(content) => Ok(LLMResponse {
                    content: content.clone(),
                    finish_reason: Some("stop".to_string()),
                    usage: None,
                }),
                None => Err(AppError::UpstreamEmptyResponse),
            }
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    fn config() -> LLMConfig {
        LLMConfig {
            groq_api_key: Some("k".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            model: "vision-model".to_string(),
            max_tokens: 512,
        }
    }

    #[test]
    fn test_image_request_is_multimodal() {
        let llm = Arc::new(RecordingLLM { reply: None, seen: Mutex::new(Vec::new()) });
        let agent = FileUploadAgent::new(llm, &config());
        let request = agent.build_request(
            "extract text",
            &PreparedContent::Image {
                base64: "QUJD".to_string(),
                media_type: "image/png".to_string(),
            },
        );

        assert_eq!(request.model, "vision-model");
        assert_eq!(request.max_tokens, Some(512));
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[1].content.has_images());
        assert_eq!(request.messages[1].content.as_text(), Some("extract text"));
    }

    #[test]
    fn test_text_request_appends_document() {
        let llm = Arc::new(RecordingLLM { reply: None, seen: Mutex::new(Vec::new()) });
        let agent = FileUploadAgent::new(llm, &config());
        let request =
            agent.build_request("summarize", &PreparedContent::Text("Line one".to_string()));

        assert_eq!(
            request.messages[1].content,
            MessageContent::Text("summarize\n\nDocument content:\nLine one".to_string())
        );
    }

    #[tokio::test]
    async fn test_run_returns_model_output() {
        let llm = Arc::new(RecordingLLM {
            reply: Some("It says hello".to_string()),
            seen: Mutex::new(Vec::new()),
        });
        let agent = FileUploadAgent::new(llm.clone(), &config());

        let output = agent
            .run("what does it say?", &PreparedContent::Text("hello".to_string()))
            .await
            .unwrap();

        assert_eq!(output, "It says hello");
        assert_eq!(llm.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_propagates_errors() {
        let llm = Arc::new(RecordingLLM { reply: None, seen: Mutex::new(Vec::new()) });
        let agent = FileUploadAgent::new(llm, &config());

        let err = agent
            .run("anything", &PreparedContent::Text("x".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamEmptyResponse));
    }
}
