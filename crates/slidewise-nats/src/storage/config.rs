//! Storage configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::NatsConfig;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_TTL_SECS: u64 = 24 * 60 * 60;

/// Job storage configuration.
///
/// Without `nats_url` the storage runs in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct StorageConfig {
    /// NATS server URL; unset or unreachable falls back to in-memory storage
    #[cfg_attr(feature = "config", arg(long = "nats-url", env = "NATS_URL"))]
    #[serde(default)]
    pub nats_url: Option<String>,

    /// NATS authentication token
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-token", env = "NATS_TOKEN", default_value = "")
    )]
    #[serde(default)]
    pub nats_token: String,

    /// Startup connection check timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "nats-connect-timeout",
            env = "NATS_CONNECT_TIMEOUT_SECS",
            default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS
        )
    )]
    pub nats_connect_timeout_secs: u64,

    /// Retention window of stored records in seconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "storage-ttl",
            env = "STORAGE_TTL_SECS",
            default_value_t = DEFAULT_TTL_SECS
        )
    )]
    pub storage_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            nats_url: None,
            nats_token: String::new(),
            nats_connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            storage_ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl StorageConfig {
    /// Sets the NATS server URL.
    pub fn with_nats_url(mut self, url: impl Into<String>) -> Self {
        self.nats_url = Some(url.into());
        self
    }

    /// Sets the retention window.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.storage_ttl_secs = ttl.as_secs();
        self
    }

    /// Returns the retention window.
    #[inline]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.storage_ttl_secs)
    }

    /// Returns the NATS connection settings, if a server is configured.
    pub fn nats(&self) -> Option<NatsConfig> {
        let url = self.nats_url.as_deref().map(str::trim)?;
        if url.is_empty() {
            return None;
        }

        let mut config =
            NatsConfig::new(url).with_connect_timeout_secs(self.nats_connect_timeout_secs);
        if !self.nats_token.is_empty() {
            config = config.with_token(self.nats_token.clone());
        }
        Some(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.storage_ttl_secs == 0 {
            return Err("storage TTL must be positive".to_string());
        }

        match self.nats() {
            Some(nats) => nats.validate(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_memory() {
        let config = StorageConfig::default();
        assert!(config.nats().is_none());
        assert_eq!(config.ttl(), Duration::from_secs(86_400));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_url_means_memory() {
        let config = StorageConfig::default().with_nats_url("  ");
        assert!(config.nats().is_none());
    }

    #[test]
    fn test_nats_settings() {
        let mut config = StorageConfig::default().with_nats_url("nats://localhost:4222");
        config.nats_token = "secret".into();
        let nats = config.nats().unwrap();
        assert_eq!(nats.token(), Some("secret"));
        assert_eq!(nats.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_ttl_validation() {
        let config = StorageConfig::default().with_ttl(std::time::Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
