//! Type-safe KV store wrapper.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{KvBackend, KvKey};
use crate::{Error, Result, TRACING_TARGET_KV};

/// Typed JSON values over a [`KvBackend`].
///
/// This store is generic over:
/// - `K`: The key type (determines the textual layout)
/// - `V`: The value type to store (must be serializable)
pub struct KvStore<K, V>
where
    K: KvKey,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    backend: Arc<dyn KvBackend>,
    _key: PhantomData<K>,
    _value: PhantomData<V>,
}

impl<K, V> Clone for KvStore<K, V>
where
    K: KvKey,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self::new(self.backend.clone())
    }
}

impl<K, V> std::fmt::Debug for KvStore<K, V>
where
    K: KvKey,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("backend", &self.backend)
            .field("value", &std::any::type_name::<V>())
            .finish()
    }
}

impl<K, V> KvStore<K, V>
where
    K: KvKey,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Wraps a backend.
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            _key: PhantomData,
            _value: PhantomData,
        }
    }

    /// Put a value into the store.
    #[tracing::instrument(skip(self, value), target = TRACING_TARGET_KV)]
    pub async fn put(&self, key: &K, value: &V) -> Result<KvEntry> {
        let key_str = key.to_string();
        let json = serde_json::to_vec(value)?;
        let size = json.len();
        let revision = self.backend.put(&key_str, json).await?;

        tracing::debug!(
            target: TRACING_TARGET_KV,
            key = %key_str,
            revision = revision,
            size_bytes = size,
            "Put value to KV store"
        );

        Ok(KvEntry {
            key: key_str,
            revision,
            size: size as u64,
        })
    }

    /// Put a value only if the key does not exist yet.
    #[tracing::instrument(skip(self, value), target = TRACING_TARGET_KV)]
    pub async fn create(&self, key: &K, value: &V) -> Result<KvEntry> {
        let key_str = key.to_string();
        let json = serde_json::to_vec(value)?;
        let size = json.len();
        let revision = self.backend.create(&key_str, json).await?;

        tracing::debug!(
            target: TRACING_TARGET_KV,
            key = %key_str,
            revision = revision,
            size_bytes = size,
            "Created value in KV store"
        );

        Ok(KvEntry {
            key: key_str,
            revision,
            size: size as u64,
        })
    }

    /// Get a value from the store.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn get(&self, key: &K) -> Result<Option<KvValue<V>>> {
        let key_str = key.to_string();
        match self.backend.entry(&key_str).await? {
            Some(entry) => {
                let size = entry.value.len();
                let value = serde_json::from_slice(&entry.value)?;
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    key = %key_str,
                    size_bytes = size,
                    revision = entry.revision,
                    "Retrieved value from KV store"
                );
                Ok(Some(KvValue {
                    key: key_str,
                    value,
                    revision: entry.revision,
                    size: size as u64,
                }))
            }
            None => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    key = %key_str,
                    "Key not found in KV store"
                );
                Ok(None)
            }
        }
    }

    /// Get a value, returning just the data.
    pub async fn get_value(&self, key: &K) -> Result<Option<V>> {
        Ok(self.get(key).await?.map(|kv| kv.value))
    }

    /// Delete a key from the store.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn delete(&self, key: &K) -> Result<()> {
        let key_str = key.to_string();
        self.backend.delete(&key_str).await?;

        tracing::debug!(
            target: TRACING_TARGET_KV,
            key = %key_str,
            "Deleted key from KV store"
        );
        Ok(())
    }

    /// Lists keys starting with `prefix` that parse as `K`.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn keys(&self, prefix: &str) -> Result<Vec<K>> {
        let keys: Vec<K> = self
            .backend
            .keys(prefix)
            .await?
            .into_iter()
            .filter_map(|key| key.parse::<K>().ok())
            .collect();

        tracing::debug!(
            target: TRACING_TARGET_KV,
            count = keys.len(),
            bucket = %self.backend.bucket(),
            "Retrieved keys from bucket"
        );
        Ok(keys)
    }

    /// Update a value only if the revision matches (optimistic concurrency).
    #[tracing::instrument(skip(self, value), target = TRACING_TARGET_KV)]
    pub async fn update(&self, key: &K, value: &V, revision: u64) -> Result<KvEntry> {
        let key_str = key.to_string();
        let json = serde_json::to_vec(value)?;
        let size = json.len();
        let new_revision = self.backend.update(&key_str, json, revision).await?;

        tracing::debug!(
            target: TRACING_TARGET_KV,
            key = %key_str,
            old_revision = revision,
            new_revision = new_revision,
            size_bytes = size,
            "Updated value in KV store"
        );

        Ok(KvEntry {
            key: key_str,
            revision: new_revision,
            size: size as u64,
        })
    }

    /// Applies `mutate` under compare-and-swap, retrying on conflicts.
    ///
    /// `mutate` returns `false` to leave the stored value untouched. Returns
    /// the value as stored afterwards with its revision, or `None` if the key
    /// does not exist.
    pub async fn modify<F>(
        &self,
        key: &K,
        max_attempts: u32,
        mut mutate: F,
    ) -> Result<Option<KvValue<V>>>
    where
        F: FnMut(&mut V) -> bool + Send,
    {
        for attempt in 1..=max_attempts {
            let Some(mut current) = self.get(key).await? else {
                return Ok(None);
            };

            if !mutate(&mut current.value) {
                return Ok(Some(current));
            }

            match self.update(key, &current.value, current.revision).await {
                Ok(entry) => {
                    return Ok(Some(KvValue {
                        key: entry.key,
                        value: current.value,
                        revision: entry.revision,
                        size: entry.size,
                    }));
                }
                Err(error) if error.is_conflict() => {
                    tracing::debug!(
                        target: TRACING_TARGET_KV,
                        key = %key,
                        attempt = attempt,
                        "Concurrent write detected, retrying"
                    );
                }
                Err(error) => return Err(error),
            }
        }

        Err(Error::Contended {
            key: key.to_string(),
            attempts: max_attempts,
        })
    }
}

/// KV entry metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvEntry {
    pub key: String,
    pub revision: u64,
    pub size: u64,
}

/// KV value with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvValue<V> {
    pub key: String,
    pub value: V,
    pub revision: u64,
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::kv::{JobKey, MemoryKvBackend};

    fn store() -> KvStore<JobKey, Vec<u32>> {
        KvStore::new(Arc::new(MemoryKvBackend::new("test")))
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = store();
        let key = JobKey::new("wr", Uuid::new_v4());

        assert!(store.get_value(&key).await.unwrap().is_none());
        let entry = store.put(&key, &vec![1, 2]).await.unwrap();
        assert_eq!(entry.key, key.to_string());

        let value = store.get(&key).await.unwrap().unwrap();
        assert_eq!(value.value, vec![1, 2]);
        assert_eq!(value.revision, entry.revision);

        store.delete(&key).await.unwrap();
        assert!(store.get_value(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_modify_retries_and_skips() {
        let store = store();
        let key = JobKey::new("wr", Uuid::new_v4());
        assert!(store.modify(&key, 3, |_| true).await.unwrap().is_none());

        store.create(&key, &vec![]).await.unwrap();
        let modified = store
            .modify(&key, 3, |v| {
                v.push(7);
                true
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(modified.value, vec![7]);

        let before = store.get(&key).await.unwrap().unwrap().revision;
        assert_eq!(modified.revision, before);
        let skipped = store.modify(&key, 3, |_| false).await.unwrap().unwrap();
        assert_eq!(skipped.revision, before);
        assert_eq!(store.get(&key).await.unwrap().unwrap().revision, before);
    }

    #[tokio::test]
    async fn test_keys_skip_foreign_layouts() {
        let store = store();
        let key = JobKey::new("wr", Uuid::new_v4());
        store.put(&key, &vec![]).await.unwrap();
        store
            .backend
            .put("wr_jobs_list", b"[]".to_vec())
            .await
            .unwrap();

        let keys = store.keys("wr_").await.unwrap();
        assert_eq!(keys, vec![key]);
    }
}
