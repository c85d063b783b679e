//! In-process mirror of stored jobs and chunk states.

use std::collections::{BTreeMap, HashMap};

use slidewise_core::types::{ChunkState, Job};
use tokio::sync::RwLock;
use uuid::Uuid;

/// A cached value with the backend revision it was read or written at.
#[derive(Debug, Clone)]
struct Revisioned<T> {
    revision: u64,
    value: T,
}

/// Replaces the entry unless it already holds a newer revision.
fn store_newer<K, T>(entries: &mut HashMap<K, Revisioned<T>>, key: K, revision: u64, value: &T)
where
    K: std::hash::Hash + Eq,
    T: Clone,
{
    let current = entries.get(&key).map(|entry| entry.revision);
    if current.is_none_or(|current| current <= revision) {
        entries.insert(
            key,
            Revisioned {
                revision,
                value: value.clone(),
            },
        );
    }
}

/// Last written value of every job and chunk state seen by this process.
///
/// Only [`JobStorage`](super::JobStorage) writes here, after the backend
/// accepted the write. Writers that finish out of order cannot roll an entry
/// back: a value only replaces an entry with an older or equal revision.
#[derive(Debug, Default)]
pub(crate) struct StateCache {
    jobs: RwLock<HashMap<Uuid, Revisioned<Job>>>,
    chunks: RwLock<HashMap<(Uuid, String), Revisioned<ChunkState>>>,
}

impl StateCache {
    pub async fn job(&self, job_id: Uuid) -> Option<Job> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .map(|entry| entry.value.clone())
    }

    pub async fn store_job(&self, job: &Job, revision: u64) {
        let mut jobs = self.jobs.write().await;
        store_newer(&mut jobs, job.job_id, revision, job);
    }

    pub async fn chunk(&self, job_id: Uuid, chunk_id: &str) -> Option<ChunkState> {
        self.chunks
            .read()
            .await
            .get(&(job_id, chunk_id.to_owned()))
            .map(|entry| entry.value.clone())
    }

    pub async fn store_chunk(&self, job_id: Uuid, state: &ChunkState, revision: u64) {
        let mut chunks = self.chunks.write().await;
        store_newer(&mut chunks, (job_id, state.chunk_id.clone()), revision, state);
    }

    /// Stores every listed chunk state of a job.
    pub async fn store_chunks(&self, job_id: Uuid, states: &BTreeMap<String, (u64, ChunkState)>) {
        let mut chunks = self.chunks.write().await;
        for (chunk_id, (revision, state)) in states {
            store_newer(&mut chunks, (job_id, chunk_id.clone()), *revision, state);
        }
    }

    pub async fn evict(&self, job_id: Uuid) {
        self.jobs.write().await.remove(&job_id);
        self.chunks.write().await.retain(|(id, _), _| *id != job_id);
    }
}

#[cfg(test)]
mod tests {
    use slidewise_core::types::{JobStatus, Tool};

    use super::*;

    #[tokio::test]
    async fn test_older_job_revision_does_not_replace_newer() {
        let cache = StateCache::default();
        let mut job = Job::new(Tool::WordingRevision, "deck.json");

        job.status = JobStatus::Done;
        cache.store_job(&job, 7).await;

        let mut stale = job.clone();
        stale.status = JobStatus::Thinking;
        cache.store_job(&stale, 5).await;
        assert_eq!(cache.job(job.job_id).await.unwrap().status, JobStatus::Done);

        let mut newer = job.clone();
        newer.status = JobStatus::Error;
        cache.store_job(&newer, 9).await;
        assert_eq!(cache.job(job.job_id).await.unwrap().status, JobStatus::Error);
    }

    #[tokio::test]
    async fn test_older_chunk_revision_does_not_replace_newer() {
        let cache = StateCache::default();
        let job = Job::new(Tool::WordingRevision, "deck.json");
        let chunk = slidewise_core::types::Chunk {
            chunk_id: "wr_0001".into(),
            page_start: 1,
            page_end: 1,
            page_numbers: vec![1],
            mode: Default::default(),
            word_count: 0,
            payload: Vec::new(),
        };

        let mut done = ChunkState::starting(job.tool, &chunk, 1);
        done.mark_failed("boom");
        cache.store_chunk(job.job_id, &done, 4).await;

        let stale = ChunkState::starting(job.tool, &chunk, 1);
        let listed = BTreeMap::from([("wr_0001".to_owned(), (2, stale))]);
        cache.store_chunks(job.job_id, &listed).await;

        let cached = cache.chunk(job.job_id, "wr_0001").await.unwrap();
        assert_eq!(cached.error.as_deref(), Some("boom"));

        cache.evict(job.job_id).await;
        assert!(cache.chunk(job.job_id, "wr_0001").await.is_none());
    }
}
