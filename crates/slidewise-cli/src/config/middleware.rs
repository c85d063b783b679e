//! Middleware configuration for the HTTP server.

use anyhow::anyhow;
use clap::Args;
use serde::{Deserialize, Serialize};
use slidewise_server::middleware::{RecoveryConfig, SecurityConfig};

use super::TRACING_TARGET_CONFIG;

/// Body limits, CORS and request timeout settings.
#[derive(Debug, Clone, Default, Args, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Body size limit and allowed CORS origins.
    #[clap(flatten)]
    pub security: SecurityConfig,

    /// Request timeout and panic recovery.
    #[clap(flatten)]
    pub recovery: RecoveryConfig,
}

impl MiddlewareConfig {
    /// Validates all middleware settings.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.security.validate().map_err(|e| anyhow!(e))?;

        let timeout = self.recovery.request_timeout_secs;
        if timeout == 0 || timeout > 300 {
            return Err(anyhow!(
                "Request timeout {timeout} seconds is invalid. Must be between 1 and 300 seconds."
            ));
        }

        Ok(())
    }

    /// Logs middleware configuration at info level.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            max_body_size = self.security.max_body_size,
            origins = ?self.security.allowed_origins,
            "Security configuration"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            request_timeout_secs = self.recovery.request_timeout_secs,
            "Recovery configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(MiddlewareConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = MiddlewareConfig {
            recovery: RecoveryConfig::with_timeout_secs(0),
            ..MiddlewareConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
