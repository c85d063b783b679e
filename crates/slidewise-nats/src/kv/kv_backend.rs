//! Revisioned byte storage.

use std::fmt;

use crate::Result;

/// A stored value with its revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub value: Vec<u8>,
    pub revision: u64,
}

/// Raw key-value storage with compare-and-swap writes.
///
/// Revisions increase with every write to the bucket; `update` only
/// succeeds if the key is still at the given revision and `create` only if
/// the key does not exist. Both report a lost race with
/// [`Error::KvRevisionMismatch`](crate::Error::KvRevisionMismatch).
#[async_trait::async_trait]
pub trait KvBackend: fmt::Debug + Send + Sync {
    /// Bucket name.
    fn bucket(&self) -> &str;

    /// Short backend name for health reporting.
    fn kind(&self) -> &'static str;

    /// Returns true if entries survive a process restart.
    fn is_durable(&self) -> bool;

    /// Reads the latest value of `key`.
    async fn entry(&self, key: &str) -> Result<Option<RawEntry>>;

    /// Writes `value` unconditionally.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<u64>;

    /// Writes `value` only if `key` does not exist.
    async fn create(&self, key: &str, value: Vec<u8>) -> Result<u64>;

    /// Writes `value` only if `key` is still at `revision`.
    async fn update(&self, key: &str, value: Vec<u8>, revision: u64) -> Result<u64>;

    /// Removes `key` and its history.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Lists keys starting with `prefix`.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}
