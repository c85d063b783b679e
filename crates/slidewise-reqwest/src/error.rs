//! Internal error types for slidewise-reqwest.

use thiserror::Error;

/// Result type alias for slidewise-reqwest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Internal error type for slidewise-reqwest operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The API answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    /// The event stream carried an error or could not be decoded.
    #[error("Stream error: {0}")]
    Stream(String),
    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<Error> for slidewise_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) => {
                if e.is_timeout() {
                    slidewise_core::Error::new(slidewise_core::ErrorKind::Timeout)
                        .with_message(e.to_string())
                        .with_source(e)
                } else if e.is_connect() {
                    slidewise_core::Error::network()
                        .with_message("Connection failed")
                        .with_source(e)
                } else {
                    slidewise_core::Error::network()
                        .with_message(e.to_string())
                        .with_source(e)
                }
            }
            Error::Serde(e) => slidewise_core::Error::serialization()
                .with_message(e.to_string())
                .with_source(e),
            Error::Api { status, message } => slidewise_core::Error::provider()
                .with_message(format!("HTTP {status}: {message}")),
            Error::Stream(message) => slidewise_core::Error::network().with_message(message),
            Error::Config(message) => slidewise_core::Error::invalid_input().with_message(message),
        }
    }
}
