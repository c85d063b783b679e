//! JetStream KV backend.

use std::time::Duration;

use async_nats::jetstream::{self, kv};
use futures::StreamExt;

use super::{KvBackend, KvBucket, RawEntry};
use crate::{Error, Result, TRACING_TARGET_KV};

/// Backend storing entries in a JetStream KV bucket.
///
/// Entries expire after the bucket's `max_age`.
#[derive(Debug, Clone)]
pub struct NatsKvBackend {
    store: kv::Store,
    bucket: &'static str,
}

impl NatsKvBackend {
    /// Opens bucket `B`, creating it with `ttl` as max age if missing.
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_KV)]
    pub(crate) async fn open<B: KvBucket>(
        jetstream: &jetstream::Context,
        ttl: Duration,
    ) -> Result<Self> {
        let store = match jetstream.get_key_value(B::NAME).await {
            Ok(store) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    bucket = %B::NAME,
                    "Using existing KV bucket"
                );
                store
            }
            Err(_) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    bucket = %B::NAME,
                    ttl_secs = ttl.as_secs(),
                    "Creating new KV bucket"
                );
                let config = kv::Config {
                    bucket: B::NAME.to_string(),
                    description: B::DESCRIPTION.to_string(),
                    max_age: ttl,
                    ..Default::default()
                };
                jetstream
                    .create_key_value(config)
                    .await
                    .map_err(|e| Error::operation("kv_create_bucket", e.to_string()))?
            }
        };

        Ok(Self {
            store,
            bucket: B::NAME,
        })
    }

    /// Turns a failed conditional write into a conflict if the key moved.
    async fn conflict_or(&self, key: &str, expected: u64, error: Error) -> Error {
        match self.entry(key).await {
            Ok(current) => {
                let actual = current.map_or(0, |entry| entry.revision);
                if actual != expected {
                    Error::kv_revision_mismatch(key, expected, actual)
                } else {
                    error
                }
            }
            Err(_) => error,
        }
    }
}

#[async_trait::async_trait]
impl KvBackend for NatsKvBackend {
    fn bucket(&self) -> &str {
        self.bucket
    }

    fn kind(&self) -> &'static str {
        "nats"
    }

    fn is_durable(&self) -> bool {
        true
    }

    async fn entry(&self, key: &str) -> Result<Option<RawEntry>> {
        let entry = self
            .store
            .entry(key)
            .await
            .map_err(|e| Error::operation("kv_get", e.to_string()))?;

        Ok(entry
            .filter(|entry| matches!(entry.operation, kv::Operation::Put))
            .map(|entry| RawEntry {
                value: entry.value.to_vec(),
                revision: entry.revision,
            }))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<u64> {
        self.store
            .put(key, value.into())
            .await
            .map_err(|e| Error::operation("kv_put", e.to_string()))
    }

    async fn create(&self, key: &str, value: Vec<u8>) -> Result<u64> {
        match self.store.create(key, value.into()).await {
            Ok(revision) => Ok(revision),
            Err(e) => {
                let error = Error::operation("kv_create", e.to_string());
                Err(self.conflict_or(key, 0, error).await)
            }
        }
    }

    async fn update(&self, key: &str, value: Vec<u8>, revision: u64) -> Result<u64> {
        match self.store.update(key, value.into(), revision).await {
            Ok(revision) => Ok(revision),
            Err(e) => {
                let error = Error::operation("kv_update", e.to_string());
                Err(self.conflict_or(key, revision, error).await)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store
            .purge(key)
            .await
            .map_err(|e| Error::operation("kv_delete", e.to_string()))
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut key_stream = self
            .store
            .keys()
            .await
            .map_err(|e| Error::operation("kv_keys", e.to_string()))?;

        while let Some(key_result) = key_stream.next().await {
            match key_result {
                Ok(key) if key.starts_with(prefix) => keys.push(key),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        target: TRACING_TARGET_KV,
                        error = %e,
                        bucket = %self.bucket,
                        "Error reading key from bucket"
                    );
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}
