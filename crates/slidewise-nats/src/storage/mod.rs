//! Job storage service.
//!
//! [`JobStorage`] is the only shared mutable state of the pipeline. It keeps
//! jobs, per-chunk states, chunk payloads and the jobs lists in one KV bucket
//! under the namespace of each job's tool, mirrored by an in-process cache for
//! reads.

mod cache;
mod config;
mod job_storage;

pub use config::StorageConfig;
pub use job_storage::{JobStorage, StorageHealth};
