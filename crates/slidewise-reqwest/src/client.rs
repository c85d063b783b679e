//! Streaming chat completion client.

use std::sync::Arc;

use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use slidewise_core::completion::{
    ChatMessage, CompletionProvider, CompletionRequest, CompletionService, DeltaStream,
};
use slidewise_core::health::ServiceHealth;

use crate::sse::{ErrorBody, SseDecoder, SseEvent, delta_content};
use crate::{Error, OpenAiConfig, Result, TRACING_TARGET};

/// Request body of `POST /chat/completions`.
#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    top_p: f32,
    stream: bool,
}

/// Inner client that holds the HTTP client and configuration.
struct OpenAiClientInner {
    http: Client,
    config: OpenAiConfig,
}

/// Reqwest-based client for OpenAI-compatible chat completions.
///
/// Implements [`CompletionProvider`] by streaming the answer as server-sent
/// events and yielding each `choices[0].delta.content` in arrival order.
#[derive(Clone)]
pub struct OpenAiClient {
    inner: Arc<OpenAiClientInner>,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Creates a client with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        config.validate().map_err(Error::Config)?;

        let timeout = config.request_timeout();
        tracing::debug!(
            target: TRACING_TARGET,
            base_url = %config.openai_base_url,
            timeout_secs = timeout.as_secs(),
            "Creating completion client"
        );

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self {
            inner: Arc::new(OpenAiClientInner { http, config }),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.inner.config
    }

    /// Converts this client into a [`CompletionService`].
    pub fn into_service(self) -> CompletionService {
        CompletionService::new(self)
    }

    async fn api_error(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) if !body.error.message.is_empty() => body.error.message,
            _ if text.trim().is_empty() => format!("status {status}"),
            _ => text,
        };
        Error::Api { status, message }
    }
}

/// Decodes a chat completion body into text deltas.
fn delta_stream<S, B>(body: S) -> DeltaStream
where
    S: futures::Stream<Item = std::result::Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let stream = async_stream::try_stream! {
        let mut body = std::pin::pin!(body);
        let mut decoder = SseDecoder::default();
        let mut deltas = 0_usize;

        while let Some(bytes) = body.next().await {
            let bytes = bytes.map_err(Error::from).map_err(slidewise_core::Error::from)?;
            for event in decoder.push(bytes.as_ref()) {
                match event {
                    SseEvent::Data(data) => {
                        let delta = delta_content(&data).map_err(slidewise_core::Error::from)?;
                        if let Some(delta) = delta {
                            deltas += 1;
                            yield delta;
                        }
                    }
                    SseEvent::Done => {
                        tracing::debug!(target: TRACING_TARGET, deltas, "Completion stream finished");
                        return;
                    }
                }
            }
        }

        for event in decoder.finish() {
            if let SseEvent::Data(data) = event {
                let delta = delta_content(&data).map_err(slidewise_core::Error::from)?;
                if let Some(delta) = delta {
                    deltas += 1;
                    yield delta;
                }
            }
        }

        tracing::debug!(
            target: TRACING_TARGET,
            deltas,
            "Completion stream closed without terminator"
        );
    };

    stream.boxed()
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiClient {
    async fn stream_completion(
        &self,
        request: &CompletionRequest,
    ) -> slidewise_core::Result<DeltaStream> {
        let config = &self.inner.config;
        let body = ChatCompletionBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            top_p: request.top_p,
            stream: true,
        };

        tracing::debug!(
            target: TRACING_TARGET,
            model = %request.model,
            messages = request.messages.len(),
            "Requesting chat completion"
        );

        let response = self
            .inner
            .http
            .post(config.endpoint("chat/completions"))
            .bearer_auth(&config.openai_api_key)
            .json(&body)
            .send()
            .await
            .map_err(Error::from)?;

        if !response.status().is_success() {
            let error = Self::api_error(response).await;
            tracing::warn!(
                target: TRACING_TARGET,
                model = %request.model,
                error = %error,
                "Chat completion rejected"
            );
            return Err(error.into());
        }

        Ok(delta_stream(response.bytes_stream()))
    }

    async fn health_check(&self) -> slidewise_core::Result<ServiceHealth> {
        let config = &self.inner.config;
        let result = self
            .inner
            .http
            .get(config.endpoint("models"))
            .bearer_auth(&config.openai_api_key)
            .send()
            .await;

        let health = match result {
            Ok(response) if response.status().is_success() => ServiceHealth::healthy(),
            Ok(response) => {
                ServiceHealth::unhealthy(Self::api_error(response).await.to_string())
            }
            Err(error) => ServiceHealth::unhealthy(Error::from(error).to_string()),
        };
        Ok(health)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use futures::{TryStreamExt, stream};

    use super::*;

    fn body(parts: &[&'static str]) -> DeltaStream {
        let parts: Vec<std::result::Result<&'static [u8], reqwest::Error>> =
            parts.iter().map(|part| Ok(part.as_bytes())).collect();
        delta_stream(stream::iter(parts))
    }

    #[test]
    fn test_client_creation() {
        let client = OpenAiClient::new(OpenAiConfig::new("sk-test")).unwrap();
        assert_eq!(client.provider_name(), "openai");
        assert!(OpenAiClient::new(OpenAiConfig::new("")).is_err());
    }

    #[tokio::test]
    async fn test_deltas_in_order() {
        let deltas: Vec<String> = body(&[
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"| Page \"}}]}\n\ndata: {\"choi",
            "ces\":[{\"delta\":{\"content\":\"| Original |\"}}]}\n\n",
            "data: [DONE]\n\n",
        ])
        .try_collect()
        .await
        .unwrap();
        assert_eq!(deltas, vec!["| Page ", "| Original |"]);
    }

    #[tokio::test]
    async fn test_unterminated_body_flushes() {
        let deltas: Vec<String> = body(&["data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}"])
            .try_collect()
            .await
            .unwrap();
        assert_eq!(deltas, vec!["x"]);
    }

    #[tokio::test]
    async fn test_error_event_fails_stream() {
        let items: Vec<slidewise_core::Result<String>> = body(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
            "data: {\"error\":{\"message\":\"server overloaded\"}}\n\n",
        ])
        .collect()
        .await;
        assert_eq!(items.len(), 2);
        let error = items[1].as_ref().unwrap_err();
        assert_eq!(error.user_message(), "server overloaded");
        assert!(error.is_retryable());
    }
}
