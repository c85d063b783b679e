use derive_builder::Builder;
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use slidewise_core::completion::CompletionService;
use slidewise_nats::{JobStorage, StorageConfig};
use slidewise_reqwest::{OpenAiClient, OpenAiConfig};

use crate::pipeline::PipelineConfig;
use crate::service::AuthConfig;
use crate::{Error, Result};

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
#[builder(
    pattern = "owned",
    setter(into, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct ServiceConfig {
    /// Job storage backend and retention.
    #[cfg_attr(feature = "config", command(flatten))]
    #[builder(default)]
    pub storage: StorageConfig,

    /// Remote model endpoint and credentials.
    #[cfg_attr(feature = "config", command(flatten))]
    pub openai: OpenAiConfig,

    /// Login password and session lifetime.
    #[cfg_attr(feature = "config", command(flatten))]
    pub auth: AuthConfig,

    /// Worker pool, timeouts and stall detection.
    #[cfg_attr(feature = "config", command(flatten))]
    #[builder(default)]
    pub pipeline: PipelineConfig,
}

impl ServiceConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Opens the job storage, falling back to memory if NATS is unusable.
    pub async fn connect_storage(&self) -> Result<JobStorage> {
        JobStorage::connect(&self.storage)
            .await
            .map_err(|e| Error::external("nats", "Failed to open job storage").with_source(e))
    }

    /// Creates the completion service backed by the OpenAI-compatible client.
    pub fn connect_completion(&self) -> Result<CompletionService> {
        let client = OpenAiClient::new(self.openai.clone()).map_err(|e| {
            Error::external("openai", "Failed to create completion client").with_source(e)
        })?;
        Ok(client.into_service())
    }

    /// Returns the pipeline configuration with the client's call deadline.
    pub fn pipeline_config(&self) -> PipelineConfig {
        self.pipeline
            .clone()
            .with_request_timeout(self.openai.request_timeout())
    }

    /// Validates every configuration group.
    pub fn validate(&self) -> Result<()> {
        self.storage.validate().map_err(Error::config)?;
        self.openai.validate().map_err(Error::config)?;
        self.auth.validate().map_err(Error::config)?;
        self.pipeline.validate().map_err(Error::config)?;
        Ok(())
    }
}

impl ServiceConfigBuilder {
    /// Wrapper for builder validation that returns String errors.
    fn validate(builder: &ServiceConfigBuilder) -> Result<(), String> {
        if let Some(storage) = &builder.storage {
            storage.validate()?;
        }

        if let Some(openai) = &builder.openai {
            openai.validate()?;
        }

        if let Some(auth) = &builder.auth {
            auth.validate()?;
        }

        if let Some(pipeline) = &builder.pipeline {
            pipeline.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn builder() -> ServiceConfigBuilder {
        ServiceConfig::builder()
            .with_openai(OpenAiConfig::new("sk-test"))
            .with_auth(AuthConfig::new("secret"))
    }

    #[test]
    fn test_builder_defaults() {
        let config = builder().build().unwrap();
        assert!(config.storage.nats_url.is_none());
        assert_eq!(config.pipeline.max_workers, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_invalid_groups() {
        let result = builder().with_auth(AuthConfig::new("")).build();
        assert!(result.is_err());

        let result = builder()
            .with_pipeline(PipelineConfig::new().with_max_workers(0))
            .build();
        assert!(result.is_err());

        assert!(ServiceConfig::builder().build().is_err());
    }

    #[test]
    fn test_pipeline_takes_client_deadline() {
        let config = builder()
            .with_openai(OpenAiConfig::new("sk-test").with_request_timeout(Duration::from_secs(90)))
            .build()
            .unwrap();
        assert_eq!(
            config.pipeline_config().request_timeout(),
            Duration::from_secs(90)
        );
    }

    #[tokio::test]
    async fn test_storage_falls_back_to_memory() {
        let config = builder().build().unwrap();
        let storage = config.connect_storage().await.unwrap();
        assert!(!storage.is_durable());
    }
}
