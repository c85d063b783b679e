//! Key-value storage primitives.
//!
//! This module provides type-safe abstractions over a revisioned KV store:
//! - `KvBackend`: raw byte storage with compare-and-swap writes, implemented
//!   by `NatsKvBackend` (JetStream KV) and `MemoryKvBackend`
//! - `KvStore<K, V>`: typed JSON values over any backend
//! - `KvKey`: key types with a stable textual layout
//! - `KvBucket`: bucket configuration
//!
//! # Example
//!
//! ```ignore
//! let backend: Arc<dyn KvBackend> = Arc::new(MemoryKvBackend::new(JobsBucket::NAME));
//! let store: KvStore<JobKey, Job> = KvStore::new(backend);
//!
//! let key = JobKey::new("wr", job.job_id);
//! store.put(&key, &job).await?;
//! let job = store.get_value(&key).await?;
//! ```

mod kv_backend;
mod kv_bucket;
mod kv_key;
mod kv_store;
mod memory_backend;
mod nats_backend;

pub use kv_backend::{KvBackend, RawEntry};
pub use kv_bucket::{JobsBucket, KvBucket};
pub use kv_key::{ChunkKey, DeckKey, JobKey, JobsListKey, KvKey, PayloadKey};
pub use kv_store::{KvEntry, KvStore, KvValue};
pub use memory_backend::MemoryKvBackend;
pub use nats_backend::NatsKvBackend;
