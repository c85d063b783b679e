//! Remote model seam.
//!
//! A [`CompletionProvider`] sends chat messages to a model and yields the
//! answer as a stream of text deltas. [`CompletionService`] wraps a provider
//! with logging and is what the pipeline holds on to.

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
mod mock;
mod service;

use futures::stream::BoxStream;
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub use mock::{MockProvider, MockReply};
use serde::{Deserialize, Serialize};
pub use service::CompletionService;

use crate::Result;
use crate::health::ServiceHealth;

/// Stream of text deltas in arrival order.
pub type DeltaStream = BoxStream<'static, Result<String>>;

/// Model used when a run does not name one.
pub const DEFAULT_MODEL: &str = "gpt-5-pro";

/// Models a run may select.
pub const ALLOWED_MODELS: &[&str] = &["gpt-5-pro", "gpt-5", "gpt-5-thinking", "gpt-4.5", "gpt-4"];

/// Returns the requested model if allowed, otherwise [`DEFAULT_MODEL`].
///
/// Names are compared case-insensitively.
pub fn resolve_model(requested: Option<&str>) -> &'static str {
    requested
        .map(str::trim)
        .and_then(|name| {
            ALLOWED_MODELS
                .iter()
                .find(|allowed| allowed.eq_ignore_ascii_case(name))
        })
        .copied()
        .unwrap_or(DEFAULT_MODEL)
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// A streaming chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub top_p: f32,
}

impl CompletionRequest {
    /// Creates a deterministic request with a single user message.
    pub fn user(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(content)],
            temperature: 0.0,
            top_p: 1.0,
        }
    }
}

/// A remote model able to stream chat completions.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Opens a streaming completion.
    ///
    /// Errors opening the call are returned directly; errors after the
    /// stream is open are yielded as stream items.
    async fn stream_completion(&self, request: &CompletionRequest) -> Result<DeltaStream>;

    /// Checks that the provider is reachable.
    async fn health_check(&self) -> Result<ServiceHealth>;

    /// Short provider name for logs.
    fn provider_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_models_fall_back_to_default() {
        assert_eq!(resolve_model(Some("gpt-4.5")), "gpt-4.5");
        assert_eq!(resolve_model(Some(" GPT-5 ")), "gpt-5");
        assert_eq!(resolve_model(Some("llama")), DEFAULT_MODEL);
        assert_eq!(resolve_model(None), DEFAULT_MODEL);
    }

    #[test]
    fn user_request_is_deterministic() {
        let request = CompletionRequest::user("gpt-5", "hello");
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.top_p, 1.0);
        let json = serde_json::to_value(&request.messages[0]).unwrap();
        assert_eq!(json["role"], "user");
    }
}
