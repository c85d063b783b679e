//! Configuration for the completion client.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default whole-call deadline: 5 minutes.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the OpenAI-compatible completion client.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct OpenAiConfig {
    /// API key sent as a bearer token
    #[cfg_attr(feature = "config", arg(long = "openai-api-key", env = "OPENAI_API_KEY"))]
    pub openai_api_key: String,

    /// Base URL of the OpenAI-compatible API
    #[cfg_attr(
        feature = "config",
        arg(long = "openai-base-url", env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)
    )]
    pub openai_base_url: String,

    /// Whole-call deadline per completion in seconds, streaming included
    #[cfg_attr(
        feature = "config",
        arg(
            long = "llm-request-timeout",
            env = "LLM_REQUEST_TIMEOUT_SECS",
            default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS
        )
    )]
    pub llm_request_timeout_secs: u64,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("openai_api_key", &"[REDACTED]")
            .field("openai_base_url", &self.openai_base_url)
            .field("llm_request_timeout_secs", &self.llm_request_timeout_secs)
            .finish()
    }
}

impl OpenAiConfig {
    /// Creates a configuration for the default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            openai_api_key: api_key.into(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            llm_request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.openai_base_url = base_url.into();
        self
    }

    /// Sets the whole-call deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.llm_request_timeout_secs = timeout.as_secs();
        self
    }

    /// Returns the whole-call deadline, using the default if zero.
    pub fn request_timeout(&self) -> Duration {
        match self.llm_request_timeout_secs {
            0 => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Returns the TCP connect timeout.
    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        DEFAULT_CONNECT_TIMEOUT
    }

    /// Returns the URL of `path` below the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.openai_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Returns the user agent sent with every request.
    pub fn user_agent(&self) -> String {
        format!("slidewise/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.openai_api_key.trim().is_empty() {
            return Err("OpenAI API key cannot be empty".to_string());
        }

        if !self.openai_base_url.starts_with("http://")
            && !self.openai_base_url.starts_with("https://")
        {
            return Err(format!(
                "Invalid OpenAI base URL: {}",
                self.openai_base_url
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::new("sk-test");
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
        assert_eq!(
            config.endpoint("chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert!(config.user_agent().starts_with("slidewise/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_joins_slashes() {
        let config = OpenAiConfig::new("sk-test").with_base_url("http://localhost:8080/v1/");
        assert_eq!(
            config.endpoint("/models"),
            "http://localhost:8080/v1/models"
        );
    }

    #[test]
    fn test_validation() {
        assert!(OpenAiConfig::new(" ").validate().is_err());
        assert!(
            OpenAiConfig::new("sk-test")
                .with_base_url("api.openai.com")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", OpenAiConfig::new("sk-secret"));
        assert!(!debug.contains("sk-secret"));
    }
}
