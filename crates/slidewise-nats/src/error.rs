//! Error types and utilities for storage operations.

use std::time::Duration;

/// Result type for all operations in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// NATS client/connection errors
    #[error("NATS connection error: {0}")]
    Connection(#[from] async_nats::Error),

    /// Serialization errors when reading or writing entries
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation timeout
    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// KV key not found
    #[error("Key '{key}' not found in bucket '{bucket}'")]
    KvKeyNotFound { bucket: String, key: String },

    /// KV revision mismatch (optimistic concurrency failure)
    #[error("Revision mismatch for key '{key}': expected {expected}, got {actual}")]
    KvRevisionMismatch {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// Update closure gave up after repeated revision conflicts
    #[error("Gave up updating '{key}' after {attempts} conflicting writes")]
    Contended { key: String, attempts: u32 },

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Generic operation error with context
    #[error("NATS operation failed: {operation} - {details}")]
    Operation { operation: String, details: String },
}

impl Error {
    /// Create an operation error with context
    pub fn operation(op: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Operation {
            operation: op.into(),
            details: details.into(),
        }
    }

    /// Create a KV key not found error
    pub fn kv_key_not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::KvKeyNotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create a KV revision mismatch error
    pub fn kv_revision_mismatch(key: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::KvRevisionMismatch {
            key: key.into(),
            expected,
            actual,
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a timeout error with the given duration
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { timeout: duration }
    }

    /// Returns true for errors caused by a concurrent writer.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::KvRevisionMismatch { .. })
    }

    /// Returns true if the addressed entry does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KvKeyNotFound { .. })
    }

    /// Get a user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            Error::Connection(_) => {
                "Connection to NATS server failed. Please check your connection.".to_string()
            }
            Error::Timeout { timeout } => {
                format!("Operation timed out after {:?}. Please try again.", timeout)
            }
            Error::KvKeyNotFound { key, .. } => format!("Key '{}' not found.", key),
            Error::KvRevisionMismatch { .. } | Error::Contended { .. } => {
                "The record was modified concurrently. Please try again.".to_string()
            }
            Error::Serialization(_) => "Stored data has an unexpected format.".to_string(),
            Error::InvalidConfig { reason } => format!("Configuration error: {}", reason),
            Error::Operation { .. } => "An unexpected error occurred. Please try again.".to_string(),
        }
    }
}
