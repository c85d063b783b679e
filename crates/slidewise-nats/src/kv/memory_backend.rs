//! Process-local backend.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{KvBackend, RawEntry};
use crate::{Error, Result};

/// In-memory backend with the same revision semantics as NATS KV.
///
/// Entries never expire and are lost when the process exits.
#[derive(Debug)]
pub struct MemoryKvBackend {
    bucket: String,
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, RawEntry>,
    last_revision: u64,
}

impl MemoryKvBackend {
    /// Creates an empty backend.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            state: RwLock::default(),
        }
    }
}

impl MemoryState {
    fn write(&mut self, key: &str, value: Vec<u8>) -> u64 {
        self.last_revision += 1;
        let revision = self.last_revision;
        self.entries
            .insert(key.to_owned(), RawEntry { value, revision });
        revision
    }

    fn revision_of(&self, key: &str) -> u64 {
        self.entries.get(key).map_or(0, |entry| entry.revision)
    }
}

#[async_trait::async_trait]
impl KvBackend for MemoryKvBackend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn kind(&self) -> &'static str {
        "memory"
    }

    fn is_durable(&self) -> bool {
        false
    }

    async fn entry(&self, key: &str) -> Result<Option<RawEntry>> {
        Ok(self.state.read().await.entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<u64> {
        Ok(self.state.write().await.write(key, value))
    }

    async fn create(&self, key: &str, value: Vec<u8>) -> Result<u64> {
        let mut state = self.state.write().await;
        let actual = state.revision_of(key);
        if actual != 0 {
            return Err(Error::kv_revision_mismatch(key, 0, actual));
        }
        Ok(state.write(key, value))
    }

    async fn update(&self, key: &str, value: Vec<u8>, revision: u64) -> Result<u64> {
        let mut state = self.state.write().await;
        let actual = state.revision_of(key);
        if actual != revision {
            return Err(Error::kv_revision_mismatch(key, revision, actual));
        }
        Ok(state.write(key, value))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.state.write().await.entries.remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let state = self.state.read().await;
        let mut keys: Vec<String> = state
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
