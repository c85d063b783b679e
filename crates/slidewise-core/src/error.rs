//! Common error type definitions.

use std::time::Duration;

use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur while preparing or running a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input validation failed.
    InvalidInput,
    /// The source deck could not be turned into slides.
    Extraction,
    /// Network-related error occurred.
    Network,
    /// A deadline or idle timeout elapsed.
    Timeout,
    /// The operation was cancelled cooperatively.
    Cancelled,
    /// The remote model rejected or garbled the request.
    Provider,
    /// Serialization/deserialization error.
    Serialization,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    /// Returns the error kind as a string for categorization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Extraction => "extraction",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Provider => "provider",
            Self::Serialization => "serialization",
            Self::Internal => "internal",
        }
    }
}

/// A structured error type for slidewise-core operations.
#[derive(Debug, Error)]
#[error("{}{}", kind.as_str(), message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates a new extraction error.
    pub fn extraction() -> Self {
        Self::new(ErrorKind::Extraction)
    }

    /// Creates a new network error.
    pub fn network() -> Self {
        Self::new(ErrorKind::Network)
    }

    /// Creates a new timeout error for the elapsed duration.
    pub fn timeout(elapsed: Duration) -> Self {
        Self::new(ErrorKind::Timeout)
            .with_message(format!("no progress within {}s", elapsed.as_secs()))
    }

    /// Creates a new cancellation error.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled)
    }

    /// Creates a new provider error.
    pub fn provider() -> Self {
        Self::new(ErrorKind::Provider)
    }

    /// Creates a new serialization error.
    pub fn serialization() -> Self {
        Self::new(ErrorKind::Serialization)
    }

    /// Creates a new internal error.
    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::Provider
        )
    }

    /// Returns a message suitable for storing on a failed chunk.
    pub fn user_message(&self) -> String {
        match (&self.message, &self.source) {
            (Some(message), _) => message.clone(),
            (None, Some(source)) => source.to_string(),
            (None, None) => self.kind.as_str().replace('_', " "),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization()
            .with_message(err.to_string())
            .with_source(err)
    }
}
