//! Scripted completion provider for tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use slidewise_core::completion::{MockProvider, MockReply};
//!
//! let provider = MockProvider::new(MockReply::text("No edits recommended."))
//!     .when_contains("Quarterly", MockReply::fail_after(["| Page |"], "connection reset"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::{StreamExt, stream};
use tokio::sync::Mutex;

use super::{CompletionProvider, CompletionRequest, DeltaStream};
use crate::health::ServiceHealth;
use crate::{Error, Result};

/// Scripted answer of the mock provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Streams the deltas and ends normally.
    Deltas(Vec<String>),
    /// Streams the deltas, then yields a network error.
    FailAfter { deltas: Vec<String>, error: String },
    /// Streams the deltas, then never yields again.
    Stall { deltas: Vec<String> },
    /// Fails to open the stream.
    Reject(String),
}

impl MockReply {
    /// Streams `text` line by line.
    pub fn text(text: impl AsRef<str>) -> Self {
        Self::Deltas(split_deltas(text.as_ref()))
    }

    /// Streams `deltas`, then fails with a network error.
    pub fn fail_after<I, S>(deltas: I, error: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::FailAfter {
            deltas: deltas.into_iter().map(Into::into).collect(),
            error: error.into(),
        }
    }

    /// Streams `deltas`, then hangs.
    pub fn stall<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stall {
            deltas: deltas.into_iter().map(Into::into).collect(),
        }
    }
}

fn split_deltas(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_owned).collect()
}

#[derive(Debug)]
struct Rule {
    needle: String,
    reply: MockReply,
    once: bool,
}

#[derive(Debug, Default)]
struct MockState {
    rules: Vec<Rule>,
    requests: Vec<CompletionRequest>,
}

/// Completion provider answering from a script.
///
/// Rules match on a substring of the request's messages and are checked in
/// insertion order; unmatched requests get the default reply.
#[derive(Debug, Clone)]
pub struct MockProvider {
    default: MockReply,
    delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
    calls: Arc<AtomicUsize>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(MockReply::text(crate::table::NO_EDITS_SENTINEL))
    }
}

impl MockProvider {
    /// Creates a provider answering every request with `default`.
    pub fn new(default: MockReply) -> Self {
        Self {
            default,
            delay: None,
            state: Arc::default(),
            calls: Arc::default(),
        }
    }

    /// Answers requests containing `needle` with `reply`.
    pub fn when_contains(self, needle: impl Into<String>, reply: MockReply) -> Self {
        self.push_rule(needle.into(), reply, false)
    }

    /// Answers the next request containing `needle` with `reply`, once.
    pub fn once_when_contains(self, needle: impl Into<String>, reply: MockReply) -> Self {
        self.push_rule(needle.into(), reply, true)
    }

    /// Waits `delay` before every delta.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn push_rule(self, needle: String, reply: MockReply, once: bool) -> Self {
        if let Ok(mut state) = self.state.try_lock() {
            state.rules.push(Rule {
                needle,
                reply,
                once,
            });
        }
        self
    }

    /// Number of streams requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, in arrival order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.state.lock().await.requests.clone()
    }

    async fn reply_for(&self, request: &CompletionRequest) -> MockReply {
        let mut state = self.state.lock().await;
        state.requests.push(request.clone());

        let matched = state.rules.iter().position(|rule| {
            request
                .messages
                .iter()
                .any(|message| message.content.contains(&rule.needle))
        });

        match matched {
            Some(index) if state.rules[index].once => state.rules.remove(index).reply,
            Some(index) => state.rules[index].reply.clone(),
            None => self.default.clone(),
        }
    }

    fn deltas(&self, deltas: Vec<String>) -> DeltaStream {
        let delay = self.delay;
        stream::iter(deltas)
            .then(move |delta| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(delta)
            })
            .boxed()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for MockProvider {
    async fn stream_completion(&self, request: &CompletionRequest) -> Result<DeltaStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let stream = match self.reply_for(request).await {
            MockReply::Deltas(deltas) => self.deltas(deltas),
            MockReply::FailAfter { deltas, error } => self
                .deltas(deltas)
                .chain(stream::once(async move {
                    Err(Error::network().with_message(error))
                }))
                .boxed(),
            MockReply::Stall { deltas } => self.deltas(deltas).chain(stream::pending()).boxed(),
            MockReply::Reject(error) => return Err(Error::provider().with_message(error)),
        };

        Ok(stream)
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;

    #[tokio::test]
    async fn streams_default_reply() {
        let provider = MockProvider::new(MockReply::text("a\nb\n"));
        let request = CompletionRequest::user("gpt-5", "hello");

        let deltas: Vec<String> = provider
            .stream_completion(&request)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(deltas, vec!["a\n", "b\n"]);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn once_rules_are_consumed() {
        let provider = MockProvider::default()
            .once_when_contains("deck", MockReply::fail_after(["| Page"], "reset"));
        let request = CompletionRequest::user("gpt-5", "the deck");

        let first: Vec<Result<String>> = provider
            .stream_completion(&request)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(first.len(), 2);
        assert!(first[1].is_err());

        let second: Vec<String> = provider
            .stream_completion(&request)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(second.concat(), "No edits recommended.");
        assert_eq!(provider.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn reject_fails_to_open() {
        let provider = MockProvider::new(MockReply::Reject("HTTP 401".into()));
        let request = CompletionRequest::user("gpt-5", "x");
        let error = provider.stream_completion(&request).await.err().unwrap();
        assert_eq!(error.user_message(), "HTTP 401");
    }
}
