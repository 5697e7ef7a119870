//! Describer
//!
//! Asks a vision-capable model for a description of one image. The request is
//! a single user turn: the fixed instruction followed by the image, bounded by
//! `max_tokens`. The first choice's text is returned as-is.

use async_trait::async_trait;
use docent_tools::{
    ChatMessage, ChatRequest, ChatResponse, CompletionClient, CompletionError, ContentPart,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{BoxError, DocentError};
use crate::reference::ImageReference;

/// The only prompt sent alongside the image
pub const DESCRIBE_INSTRUCTION: &str = "Describe this image.";

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, BoxError>;
}

#[async_trait]
impl CompletionService for CompletionClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, BoxError> {
        Ok(CompletionClient::complete(self, request).await?)
    }
}

/// Generated text and the image it describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionResult {
    pub text: String,
    pub reference: ImageReference,
}

#[derive(Clone)]
pub struct Describer {
    service: Arc<dyn CompletionService>,
    model: String,
    max_tokens: u32,
}

impl Describer {
    pub fn new(service: Arc<dyn CompletionService>, model: &str, max_tokens: u32) -> Self {
        Self {
            service,
            model: model.to_string(),
            max_tokens,
        }
    }

    pub fn build_request(&self, reference: &ImageReference) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(vec![
                ContentPart::text(DESCRIBE_INSTRUCTION),
                ContentPart::image_url(reference.to_request_url()),
            ])],
            max_tokens: self.max_tokens,
        }
    }

    pub async fn describe(
        &self,
        reference: ImageReference,
    ) -> Result<DescriptionResult, DocentError> {
        info!("Describing {} with model {}", reference.summary(), self.model);

        let request = self.build_request(&reference);
        let response = self.service.complete(&request).await.map_err(|e| {
            warn!("Description of {} failed: {}", reference.summary(), e);
            DocentError::describe_failed(e)
        })?;

        let text = response
            .first_text()
            .ok_or_else(|| DocentError::describe_failed(CompletionError::EmptyResponse))?
            .to_string();

        info!("Image described successfully ({} chars)", text.len());
        debug!(
            "Image description: {}",
            text.chars().take(200).collect::<String>()
        );

        Ok(DescriptionResult { text, reference })
    }
}

impl std::fmt::Debug for Describer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Describer")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;

    /// Records every request and answers with a canned reply
    pub struct FakeCompletions {
        pub requests: Mutex<Vec<ChatRequest>>,
        reply: Result<Option<String>, String>,
    }

    impl FakeCompletions {
        pub fn replying(text: &str) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reply: Ok(Some(text.to_string())),
            }
        }

        pub fn empty() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reply: Ok(None),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reply: Err(message.to_string()),
            }
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionService for FakeCompletions {
        async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, BoxError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(content) => Ok(serde_json::from_value(serde_json::json!({
                    "choices": [{ "message": { "role": "assistant", "content": content } }]
                }))?),
                Err(message) => Err(message.clone().into()),
            }
        }
    }
}
