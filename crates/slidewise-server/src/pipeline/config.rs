//! Pipeline configuration.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

/// Default number of chunks streamed concurrently.
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Default idle time after which an active chunk is declared stalled.
pub const DEFAULT_STALL_THRESHOLD_SECS: u64 = 300;

/// Default period of the background stall sweep.
pub const DEFAULT_STALL_SWEEP_INTERVAL_SECS: u64 = 30;

/// Default maximum gap between two streamed deltas.
pub const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 60;

/// Default whole-call deadline of one chunk attempt.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Configuration of the worker pool, chunk workers and stall detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct PipelineConfig {
    /// Maximum number of chunks streamed concurrently
    #[cfg_attr(
        feature = "config",
        arg(long = "max-workers", env = "WR_MAX_WORKERS", default_value_t = DEFAULT_MAX_WORKERS)
    )]
    pub max_workers: usize,

    /// Idle seconds after which an active chunk is failed as stalled
    #[cfg_attr(
        feature = "config",
        arg(
            long = "stall-threshold",
            env = "STALL_THRESHOLD_SECS",
            default_value_t = DEFAULT_STALL_THRESHOLD_SECS
        )
    )]
    pub stall_threshold_secs: u64,

    /// Seconds between two background stall sweeps
    #[cfg_attr(
        feature = "config",
        arg(
            long = "stall-sweep-interval",
            env = "STALL_SWEEP_INTERVAL_SECS",
            default_value_t = DEFAULT_STALL_SWEEP_INTERVAL_SECS
        )
    )]
    pub stall_sweep_interval_secs: u64,

    /// Maximum seconds between two streamed deltas
    #[cfg_attr(
        feature = "config",
        arg(
            long = "llm-stream-idle-timeout",
            env = "LLM_STREAM_IDLE_TIMEOUT_SECS",
            default_value_t = DEFAULT_STREAM_IDLE_TIMEOUT_SECS
        )
    )]
    pub stream_idle_timeout_secs: u64,

    /// Whole-call deadline of one chunk attempt, copied from the client config.
    #[cfg_attr(feature = "config", arg(skip = DEFAULT_REQUEST_TIMEOUT_SECS))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            stall_threshold_secs: DEFAULT_STALL_THRESHOLD_SECS,
            stall_sweep_interval_secs: DEFAULT_STALL_SWEEP_INTERVAL_SECS,
            stream_idle_timeout_secs: DEFAULT_STREAM_IDLE_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    /// Creates a new pipeline configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker pool size.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Sets the stall threshold.
    pub fn with_stall_threshold(mut self, threshold: Duration) -> Self {
        self.stall_threshold_secs = threshold.as_secs();
        self
    }

    /// Sets the background sweep period.
    pub fn with_stall_sweep_interval(mut self, interval: Duration) -> Self {
        self.stall_sweep_interval_secs = interval.as_secs();
        self
    }

    /// Sets the maximum gap between deltas.
    pub fn with_stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the whole-call deadline of a chunk attempt.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Returns the stall threshold.
    #[inline]
    pub fn stall_threshold(&self) -> Duration {
        Duration::from_secs(self.stall_threshold_secs)
    }

    /// Returns the background sweep period.
    #[inline]
    pub fn stall_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.stall_sweep_interval_secs.max(1))
    }

    /// Returns the maximum gap between deltas.
    #[inline]
    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }

    /// Returns the whole-call deadline of a chunk attempt.
    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Creates the semaphore bounding concurrent chunk workers.
    pub fn create_semaphore(&self) -> Arc<Semaphore> {
        Arc::new(Semaphore::new(self.max_workers))
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("Worker pool size must be greater than 0".to_string());
        }

        if self.max_workers > 64 {
            return Err("Worker pool size cannot exceed 64".to_string());
        }

        if self.stall_threshold_secs == 0 {
            return Err("Stall threshold must be at least 1 second".to_string());
        }

        if self.stream_idle_timeout_secs == 0 {
            return Err("Stream idle timeout must be at least 1 second".to_string());
        }

        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be at least 1 second".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.stall_threshold(), Duration::from_secs(300));
        assert_eq!(config.stall_sweep_interval(), Duration::from_secs(30));
        assert_eq!(config.stream_idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.create_semaphore().available_permits(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(PipelineConfig::new().with_max_workers(0).validate().is_err());
        assert!(
            PipelineConfig::new()
                .with_stall_threshold(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
