use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::{CompletionProvider, CompletionRequest, DeltaStream};
use crate::health::ServiceHealth;
use crate::{Result, TRACING_TARGET_COMPLETION};

/// Completion provider wrapper with observability.
///
/// Cloning is cheap; the provider is shared behind an `Arc`.
#[derive(Clone)]
pub struct CompletionService {
    inner: Arc<dyn CompletionProvider>,
}

impl CompletionService {
    /// Wraps a provider.
    pub fn new<P>(provider: P) -> Self
    where
        P: CompletionProvider + 'static,
    {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// Wraps an already shared provider.
    pub fn from_arc(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { inner: provider }
    }

    /// Opens a streaming completion.
    pub async fn stream(&self, request: &CompletionRequest) -> Result<DeltaStream> {
        let start = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET_COMPLETION,
            provider = self.inner.provider_name(),
            model = %request.model,
            messages = request.messages.len(),
            "Opening completion stream"
        );

        let result = self.inner.stream_completion(request).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => tracing::debug!(
                target: TRACING_TARGET_COMPLETION,
                provider = self.inner.provider_name(),
                elapsed_ms = elapsed.as_millis(),
                "Completion stream opened"
            ),
            Err(error) => tracing::error!(
                target: TRACING_TARGET_COMPLETION,
                provider = self.inner.provider_name(),
                error = %error,
                elapsed_ms = elapsed.as_millis(),
                "Failed to open completion stream"
            ),
        }

        result
    }

    /// Checks provider health.
    pub async fn health_check(&self) -> Result<ServiceHealth> {
        let start = Instant::now();
        let health = self.inner.health_check().await?;
        Ok(health.with_response_time(start.elapsed()))
    }

    /// Returns the provider name.
    pub fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }
}

impl fmt::Debug for CompletionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionService")
            .field("provider", &self.inner.provider_name())
            .finish()
    }
}
