//! Job and chunk state storage service.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use slidewise_core::types::{Chunk, ChunkState, Job, Slide, Tool};
use strum::IntoEnumIterator;
use uuid::Uuid;

use super::StorageConfig;
use super::cache::StateCache;
use crate::kv::{
    ChunkKey, DeckKey, JobKey, JobsBucket, JobsListKey, KvBackend, KvStore, MemoryKvBackend,
    PayloadKey,
};
use crate::{Error, NatsClient, Result, TRACING_TARGET_STORAGE};

/// Compare-and-swap attempts before an update gives up.
const MAX_UPDATE_ATTEMPTS: u32 = 16;

/// Backend in use, as reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageHealth {
    /// `"nats"` or `"memory"`.
    pub backend: &'static str,
    /// False when records do not survive a restart.
    pub durable: bool,
}

/// Storage for jobs, their chunk states and the jobs lists.
///
/// Backed by NATS JetStream KV when reachable at startup and by process memory
/// otherwise; both behave the same apart from durability. Every record is
/// keyed under the namespace of its job's [`Tool`], so wording revision and
/// slide review jobs never share keys. Partial updates are closures applied
/// in a compare-and-swap loop on the entry revision, so concurrent writers
/// never lose each other's changes.
///
/// The uploaded deck and the chunk payloads are stored under their own keys;
/// the job record only carries descriptors and stays small however large the
/// deck is.
///
/// Cloning is cheap; clones share the backend and the cache.
#[derive(Debug, Clone)]
pub struct JobStorage {
    inner: Arc<JobStorageInner>,
}

#[derive(Debug)]
struct JobStorageInner {
    backend: Arc<dyn KvBackend>,
    jobs: KvStore<JobKey, Job>,
    chunks: KvStore<ChunkKey, ChunkState>,
    decks: KvStore<DeckKey, String>,
    payloads: KvStore<PayloadKey, Vec<Slide>>,
    lists: KvStore<JobsListKey, BTreeSet<Uuid>>,
    cache: StateCache,
}

impl JobStorage {
    /// Connects to the configured backend, falling back to memory.
    ///
    /// Only an invalid configuration is an error; an unreachable server is
    /// logged and degrades to the in-memory backend.
    #[tracing::instrument(skip(config), target = TRACING_TARGET_STORAGE)]
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        config.validate().map_err(Error::invalid_config)?;

        let Some(nats) = config.nats() else {
            tracing::warn!(
                target: TRACING_TARGET_STORAGE,
                "No NATS server configured, job state will not survive a restart"
            );
            return Ok(Self::in_memory());
        };

        let opened = match NatsClient::connect(nats).await {
            Ok(client) => {
                client
                    .kv_backend_with_ttl::<JobsBucket>(config.ttl())
                    .await
            }
            Err(error) => Err(error),
        };

        match opened {
            Ok(backend) => {
                tracing::info!(
                    target: TRACING_TARGET_STORAGE,
                    ttl_secs = config.storage_ttl_secs,
                    "Using NATS KV job storage"
                );
                Ok(Self::with_backend(Arc::new(backend)))
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_STORAGE,
                    error = %error,
                    "NATS unavailable, falling back to in-memory job storage"
                );
                Ok(Self::in_memory())
            }
        }
    }

    /// Creates storage that lives in process memory.
    pub fn in_memory() -> Self {
        let backend = Arc::new(MemoryKvBackend::new(
            <JobsBucket as crate::kv::KvBucket>::NAME,
        ));
        Self::with_backend(backend)
    }

    /// Creates storage over an opened backend.
    pub fn with_backend(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            inner: Arc::new(JobStorageInner {
                jobs: KvStore::new(backend.clone()),
                chunks: KvStore::new(backend.clone()),
                decks: KvStore::new(backend.clone()),
                payloads: KvStore::new(backend.clone()),
                lists: KvStore::new(backend.clone()),
                backend,
                cache: StateCache::default(),
            }),
        }
    }

    /// Returns true if records survive a process restart.
    #[inline]
    pub fn is_durable(&self) -> bool {
        self.inner.backend.is_durable()
    }

    /// Reports the backend in use.
    pub fn health(&self) -> StorageHealth {
        StorageHealth {
            backend: self.inner.backend.kind(),
            durable: self.is_durable(),
        }
    }

    /// Stores a new job with its uploaded deck and registers it in the jobs
    /// list of its tool.
    #[tracing::instrument(skip(self, job, deck), fields(job_id = %job.job_id), target = TRACING_TARGET_STORAGE)]
    pub async fn create_job(&self, job: &Job, deck: &str) -> Result<()> {
        let namespace = job.tool.namespace();
        let entry = self
            .inner
            .jobs
            .create(&JobKey::new(namespace, job.job_id), job)
            .await?;
        self.inner.cache.store_job(job, entry.revision).await;

        self.inner
            .decks
            .put(&DeckKey::new(namespace, job.job_id), &deck.to_owned())
            .await?;
        self.register_job(job.tool, job.job_id).await?;

        tracing::debug!(
            target: TRACING_TARGET_STORAGE,
            job_id = %job.job_id,
            tool = %job.tool,
            deck_bytes = deck.len(),
            "Job created"
        );
        Ok(())
    }

    /// Reads a job.
    pub async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>> {
        if let Some(job) = self.inner.cache.job(job_id).await {
            return Ok(Some(job));
        }

        self.load_job(job_id).await
    }

    /// Reads a job from the backend, probing the namespace of every tool.
    async fn load_job(&self, job_id: Uuid) -> Result<Option<Job>> {
        for tool in Tool::iter() {
            let key = JobKey::new(tool.namespace(), job_id);
            if let Some(entry) = self.inner.jobs.get(&key).await? {
                self.inner.cache.store_job(&entry.value, entry.revision).await;
                return Ok(Some(entry.value));
            }
        }

        Ok(None)
    }

    /// Returns the tool of a known job.
    async fn tool_of(&self, job_id: Uuid) -> Result<Option<Tool>> {
        Ok(self.get_job(job_id).await?.map(|job| job.tool))
    }

    /// Applies `mutate` to a job under compare-and-swap.
    ///
    /// `mutate` returns `false` to skip the write; it may run more than once
    /// when writers race. Returns the job as stored afterwards, or `None` for
    /// an unknown job.
    #[tracing::instrument(skip(self, mutate), target = TRACING_TARGET_STORAGE)]
    pub async fn update_job<F>(&self, job_id: Uuid, mut mutate: F) -> Result<Option<Job>>
    where
        F: FnMut(&mut Job) -> bool + Send,
    {
        let Some(tool) = self.tool_of(job_id).await? else {
            return Ok(None);
        };

        let updated = self
            .inner
            .jobs
            .modify(
                &JobKey::new(tool.namespace(), job_id),
                MAX_UPDATE_ATTEMPTS,
                |job| {
                    let changed = mutate(job);
                    if changed {
                        job.touch();
                    }
                    changed
                },
            )
            .await?;

        let Some(updated) = updated else {
            return Ok(None);
        };
        self.inner
            .cache
            .store_job(&updated.value, updated.revision)
            .await;
        Ok(Some(updated.value))
    }

    /// Reads the uploaded deck of a job, if it is still held.
    pub async fn get_deck(&self, job_id: Uuid) -> Result<Option<String>> {
        let Some(tool) = self.tool_of(job_id).await? else {
            return Ok(None);
        };

        self.inner
            .decks
            .get_value(&DeckKey::new(tool.namespace(), job_id))
            .await
    }

    /// Drops the uploaded deck once its slides are chunked.
    pub async fn delete_deck(&self, job_id: Uuid) -> Result<()> {
        let Some(tool) = self.tool_of(job_id).await? else {
            return Ok(());
        };

        self.inner
            .decks
            .delete(&DeckKey::new(tool.namespace(), job_id))
            .await
    }

    /// Stores the slides of a chunk apart from the job record.
    pub async fn set_chunk_payload(&self, job_id: Uuid, tool: Tool, chunk: &Chunk) -> Result<()> {
        let key = PayloadKey::new(tool.namespace(), job_id, chunk.chunk_id.as_str());
        self.inner.payloads.put(&key, &chunk.payload).await?;
        Ok(())
    }

    /// Reads the slides of a chunk.
    pub async fn get_chunk_payload(&self, job_id: Uuid, chunk_id: &str) -> Result<Option<Vec<Slide>>> {
        let Some(tool) = self.tool_of(job_id).await? else {
            return Ok(None);
        };

        self.inner
            .payloads
            .get_value(&PayloadKey::new(tool.namespace(), job_id, chunk_id))
            .await
    }

    /// Writes a chunk state unconditionally.
    #[tracing::instrument(
        skip(self, state),
        fields(chunk_id = %state.chunk_id),
        target = TRACING_TARGET_STORAGE
    )]
    pub async fn set_chunk_result(&self, job_id: Uuid, state: &ChunkState) -> Result<()> {
        let mut state = state.clone();
        state.touch();
        let key = ChunkKey::new(state.rows.tool().namespace(), job_id, state.chunk_id.as_str());
        let entry = self.inner.chunks.put(&key, &state).await?;
        self.inner
            .cache
            .store_chunk(job_id, &state, entry.revision)
            .await;
        Ok(())
    }

    /// Applies `mutate` to a chunk state under compare-and-swap.
    ///
    /// Same contract as [`update_job`](Self::update_job).
    #[tracing::instrument(skip(self, mutate), target = TRACING_TARGET_STORAGE)]
    pub async fn update_chunk_result<F>(
        &self,
        job_id: Uuid,
        chunk_id: &str,
        mut mutate: F,
    ) -> Result<Option<ChunkState>>
    where
        F: FnMut(&mut ChunkState) -> bool + Send,
    {
        let Some(tool) = self.tool_of(job_id).await? else {
            return Ok(None);
        };

        let updated = self
            .inner
            .chunks
            .modify(
                &ChunkKey::new(tool.namespace(), job_id, chunk_id),
                MAX_UPDATE_ATTEMPTS,
                |state| {
                    let changed = mutate(state);
                    if changed {
                        state.touch();
                    }
                    changed
                },
            )
            .await?;

        let Some(updated) = updated else {
            return Ok(None);
        };
        self.inner
            .cache
            .store_chunk(job_id, &updated.value, updated.revision)
            .await;
        Ok(Some(updated.value))
    }

    /// Reads one chunk state.
    pub async fn get_chunk_result(&self, job_id: Uuid, chunk_id: &str) -> Result<Option<ChunkState>> {
        if let Some(state) = self.inner.cache.chunk(job_id, chunk_id).await {
            return Ok(Some(state));
        }

        let Some(tool) = self.tool_of(job_id).await? else {
            return Ok(None);
        };

        let entry = self
            .inner
            .chunks
            .get(&ChunkKey::new(tool.namespace(), job_id, chunk_id))
            .await?;
        let Some(entry) = entry else {
            return Ok(None);
        };
        self.inner
            .cache
            .store_chunk(job_id, &entry.value, entry.revision)
            .await;
        Ok(Some(entry.value))
    }

    /// Reads every chunk state of a job, keyed and ordered by chunk id.
    pub async fn get_chunk_results(&self, job_id: Uuid) -> Result<BTreeMap<String, ChunkState>> {
        let Some(tool) = self.tool_of(job_id).await? else {
            return Ok(BTreeMap::new());
        };

        let prefix = ChunkKey::job_prefix(tool.namespace(), job_id);
        let mut listed = BTreeMap::new();
        for key in self.inner.chunks.keys(&prefix).await? {
            if let Some(entry) = self.inner.chunks.get(&key).await? {
                listed.insert(key.chunk_id, (entry.revision, entry.value));
            }
        }

        self.inner.cache.store_chunks(job_id, &listed).await;
        Ok(listed
            .into_iter()
            .map(|(chunk_id, (_, state))| (chunk_id, state))
            .collect())
    }

    /// Deletes a job with its deck, chunk payloads and chunk states.
    ///
    /// Returns false if the job did not exist.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_STORAGE)]
    pub async fn cleanup_job(&self, job_id: Uuid) -> Result<bool> {
        let Some(tool) = self.load_job(job_id).await?.map(|job| job.tool) else {
            self.inner.cache.evict(job_id).await;
            return Ok(false);
        };
        let namespace = tool.namespace();

        let chunk_keys = self
            .inner
            .chunks
            .keys(&ChunkKey::job_prefix(namespace, job_id))
            .await?;
        let chunk_count = chunk_keys.len();
        for key in chunk_keys {
            self.inner.chunks.delete(&key).await?;
        }

        let payload_keys = self
            .inner
            .payloads
            .keys(&PayloadKey::job_prefix(namespace, job_id))
            .await?;
        for key in payload_keys {
            self.inner.payloads.delete(&key).await?;
        }

        self.inner
            .decks
            .delete(&DeckKey::new(namespace, job_id))
            .await?;
        self.inner
            .jobs
            .delete(&JobKey::new(namespace, job_id))
            .await?;
        self.inner.cache.evict(job_id).await;
        self.unregister_jobs(tool, &BTreeSet::from([job_id])).await?;

        tracing::info!(
            target: TRACING_TARGET_STORAGE,
            job_id = %job_id,
            tool = %tool,
            chunks = chunk_count,
            "Job cleaned up"
        );
        Ok(true)
    }

    /// Lists known jobs of every tool, oldest first.
    ///
    /// Ids whose job record has expired are pruned from the jobs lists.
    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let mut jobs = Vec::new();
        for tool in Tool::iter() {
            jobs.extend(self.list_tool_jobs(tool).await?);
        }

        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }

    async fn list_tool_jobs(&self, tool: Tool) -> Result<Vec<Job>> {
        let namespace = tool.namespace();
        let ids = self
            .inner
            .lists
            .get_value(&JobsListKey::new(namespace))
            .await?
            .unwrap_or_default();

        let mut jobs = Vec::with_capacity(ids.len());
        let mut expired = BTreeSet::new();
        for job_id in ids {
            match self.inner.jobs.get(&JobKey::new(namespace, job_id)).await? {
                Some(entry) => {
                    self.inner.cache.store_job(&entry.value, entry.revision).await;
                    jobs.push(entry.value);
                }
                None => {
                    self.inner.cache.evict(job_id).await;
                    expired.insert(job_id);
                }
            }
        }

        if !expired.is_empty() {
            tracing::debug!(
                target: TRACING_TARGET_STORAGE,
                tool = %tool,
                count = expired.len(),
                "Pruning expired jobs from the jobs list"
            );
            self.unregister_jobs(tool, &expired).await?;
        }

        Ok(jobs)
    }

    async fn register_job(&self, tool: Tool, job_id: Uuid) -> Result<()> {
        let key = JobsListKey::new(tool.namespace());
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let updated = self
                .inner
                .lists
                .modify(&key, MAX_UPDATE_ATTEMPTS, |ids| ids.insert(job_id))
                .await?;
            if updated.is_some() {
                return Ok(());
            }

            match self.inner.lists.create(&key, &BTreeSet::from([job_id])).await {
                Ok(_) => return Ok(()),
                Err(error) if error.is_conflict() => continue,
                Err(error) => return Err(error),
            }
        }

        Err(Error::Contended {
            key: key.to_string(),
            attempts: MAX_UPDATE_ATTEMPTS,
        })
    }

    async fn unregister_jobs(&self, tool: Tool, job_ids: &BTreeSet<Uuid>) -> Result<()> {
        self.inner
            .lists
            .modify(
                &JobsListKey::new(tool.namespace()),
                MAX_UPDATE_ATTEMPTS,
                |ids| {
                    let before = ids.len();
                    ids.retain(|id| !job_ids.contains(id));
                    ids.len() != before
                },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use slidewise_core::chunk_slides;
    use slidewise_core::types::{ChunkMode, ChunkStatus, JobStatus};

    use super::*;

    fn job_with_chunks(tool: Tool) -> Job {
        let mut job = Job::new(tool, "deck.json");
        let slides: Vec<Slide> = (1..=3).map(|n| Slide::new(n, vec![])).collect();
        job.chunks = chunk_slides(&slides, ChunkMode::Fast, tool.namespace())
            .iter()
            .map(Chunk::descriptor)
            .collect();
        job.chunks_total = job.chunks.len();
        job
    }

    fn job() -> Job {
        job_with_chunks(Tool::WordingRevision)
    }

    #[tokio::test]
    async fn test_job_round_trip() {
        let storage = JobStorage::in_memory();
        let job = job();
        storage.create_job(&job, "[]").await.unwrap();

        let stored = storage.get_job(job.job_id).await.unwrap().unwrap();
        assert_eq!(stored.job_id, job.job_id);
        assert!(storage.create_job(&job, "[]").await.unwrap_err().is_conflict());
        assert!(storage.get_job(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_job_stamps_and_skips() {
        let storage = JobStorage::in_memory();
        let job = job();
        storage.create_job(&job, "[]").await.unwrap();

        let updated = storage
            .update_job(job.job_id, |job| {
                job.status = JobStatus::Parsing;
                true
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, JobStatus::Parsing);
        assert!(updated.last_update >= job.last_update);

        let skipped = storage
            .update_job(job.job_id, |job| {
                job.status = JobStatus::Error;
                false
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(skipped.status, JobStatus::Parsing);
        assert_eq!(
            storage.get_job(job.job_id).await.unwrap().unwrap().status,
            JobStatus::Parsing
        );

        let missing = storage.update_job(Uuid::new_v4(), |_| true).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_counter_updates_are_not_lost() {
        let storage = JobStorage::in_memory();
        let job = job();
        storage.create_job(&job, "[]").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let storage = storage.clone();
            let job_id = job.job_id;
            handles.push(tokio::spawn(async move {
                storage
                    .update_job(job_id, |job| {
                        job.chunks_sent += 1;
                        job.chunks_completed = job.chunks_sent;
                        true
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // The cache must hold the last revision whatever order the writers
        // finished in.
        let cached = storage.get_job(job.job_id).await.unwrap().unwrap();
        assert_eq!(cached.chunks_sent, 8);
        assert_eq!(cached.chunks_completed, 8);

        let stored = JobStorage::with_backend(storage.inner.backend.clone())
            .get_job(job.job_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, cached);
    }

    #[tokio::test]
    async fn test_chunk_results() {
        let storage = JobStorage::in_memory();
        let job = job();
        storage.create_job(&job, "[]").await.unwrap();

        let chunk = &job.chunks[0];
        let state = ChunkState::starting(job.tool, chunk, 1);
        storage.set_chunk_result(job.job_id, &state).await.unwrap();

        storage
            .update_chunk_result(job.job_id, &chunk.chunk_id, |state| {
                state.mark_sending();
                true
            })
            .await
            .unwrap();

        let stored = storage
            .get_chunk_result(job.job_id, &chunk.chunk_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ChunkStatus::Sending);

        let all = storage.get_chunk_results(job.job_id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key(&chunk.chunk_id));

        let other = storage.get_chunk_results(Uuid::new_v4()).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_deck_and_payloads_live_outside_the_job_record() {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryKvBackend::new("test"));
        let storage = JobStorage::with_backend(backend.clone());

        let deck = "x".repeat(64 * 1024);
        let mut job = job();
        storage.create_job(&job, &deck).await.unwrap();

        let slides: Vec<Slide> = (1..=3).map(|n| Slide::new(n, vec![])).collect();
        let full = chunk_slides(&slides, ChunkMode::Fast, "wr").remove(0);
        storage
            .set_chunk_payload(job.job_id, job.tool, &full)
            .await
            .unwrap();
        job.chunks = vec![full.descriptor()];
        storage
            .update_job(job.job_id, |stored| {
                stored.chunks.clone_from(&job.chunks);
                true
            })
            .await
            .unwrap();

        let record = backend
            .entry(&JobKey::new("wr", job.job_id).to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(record.value.len() < 4 * 1024);
        assert!(!String::from_utf8_lossy(&record.value).contains("payload"));

        assert_eq!(storage.get_deck(job.job_id).await.unwrap(), Some(deck));
        let payload = storage
            .get_chunk_payload(job.job_id, &full.chunk_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload, full.payload);

        storage.delete_deck(job.job_id).await.unwrap();
        assert!(storage.get_deck(job.job_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_cascades() {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryKvBackend::new("test"));
        let storage = JobStorage::with_backend(backend.clone());
        let job = job();
        storage.create_job(&job, "[]").await.unwrap();
        let state = ChunkState::starting(job.tool, &job.chunks[0], 1);
        storage.set_chunk_result(job.job_id, &state).await.unwrap();
        storage
            .set_chunk_payload(job.job_id, job.tool, &job.chunks[0])
            .await
            .unwrap();

        assert!(storage.cleanup_job(job.job_id).await.unwrap());
        assert!(storage.get_job(job.job_id).await.unwrap().is_none());
        assert!(storage.get_chunk_results(job.job_id).await.unwrap().is_empty());
        assert!(storage.list_jobs().await.unwrap().is_empty());
        assert_eq!(backend.keys("wr_").await.unwrap(), vec!["wr_jobs_list"]);
        assert!(!storage.cleanup_job(job.job_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_jobs_prunes_expired_ids() {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryKvBackend::new("test"));
        let storage = JobStorage::with_backend(backend.clone());

        let kept = job();
        let expired = job();
        storage.create_job(&kept, "[]").await.unwrap();
        storage.create_job(&expired, "[]").await.unwrap();

        // Simulates TTL expiry of one record.
        backend
            .delete(&JobKey::new("wr", expired.job_id).to_string())
            .await
            .unwrap();

        let jobs = storage.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_id, kept.job_id);

        let ids: BTreeSet<Uuid> = storage
            .inner
            .lists
            .get_value(&JobsListKey::new("wr"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids, BTreeSet::from([kept.job_id]));
    }

    #[tokio::test]
    async fn test_records_are_keyed_by_tool_namespace() {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryKvBackend::new("test"));
        let storage = JobStorage::with_backend(backend.clone());

        let revision = job_with_chunks(Tool::WordingRevision);
        let review = job_with_chunks(Tool::SlideReview);
        storage.create_job(&revision, "[]").await.unwrap();
        storage.create_job(&review, "[]").await.unwrap();
        let state = ChunkState::starting(review.tool, &review.chunks[0], 1);
        storage.set_chunk_result(review.job_id, &state).await.unwrap();

        let review_keys = backend.keys("sr_").await.unwrap();
        assert!(review_keys.contains(&JobKey::new("sr", review.job_id).to_string()));
        assert!(review_keys.contains(&DeckKey::new("sr", review.job_id).to_string()));
        assert!(review_keys.contains(&ChunkKey::new("sr", review.job_id, "sr_0001").to_string()));
        assert!(review_keys.contains(&"sr_jobs_list".to_owned()));
        let revision_keys = backend.keys("wr_").await.unwrap();
        assert!(revision_keys.iter().all(|key| !key.contains(&review.job_id.to_string())));

        // A fresh process resolves either tool from the backend alone.
        let restarted = JobStorage::with_backend(backend);
        let loaded = restarted.get_job(review.job_id).await.unwrap().unwrap();
        assert_eq!(loaded.tool, Tool::SlideReview);
        assert_eq!(
            restarted.get_chunk_results(review.job_id).await.unwrap().len(),
            1
        );
        assert_eq!(restarted.list_jobs().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_connect_without_server_is_memory() {
        let storage = JobStorage::connect(&StorageConfig::default()).await.unwrap();
        let health = storage.health();
        assert_eq!(health.backend, "memory");
        assert!(!health.durable);
    }
}
