#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for NATS client operations.
///
/// Use this target for logging client initialization, configuration, and client-level errors.
pub const TRACING_TARGET_CLIENT: &str = "slidewise_nats::client";

/// Tracing target for NATS connection operations.
pub const TRACING_TARGET_CONNECTION: &str = "slidewise_nats::connection";

/// Tracing target for key-value backend operations.
pub const TRACING_TARGET_KV: &str = "slidewise_nats::kv";

/// Tracing target for job storage operations.
///
/// Use this target for job and chunk state reads, writes, fallbacks and cleanup.
pub const TRACING_TARGET_STORAGE: &str = "slidewise_nats::storage";

mod client;
mod error;
pub mod kv;
pub mod storage;

// Re-export async_nats types needed by consumers
pub use async_nats::jetstream;
pub use client::{NatsClient, NatsConfig};
pub use error::{Error, Result};
pub use storage::{JobStorage, StorageConfig, StorageHealth};
