//! Job orchestration: run start, chunk submission, progress and merge.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use jiff::Timestamp;
use serde::Serialize;
use slidewise_core::chunk_slides;
use slidewise_core::completion::{CompletionService, resolve_model};
use slidewise_core::extract::SlideExtractor;
use slidewise_core::table::merge_rows;
use slidewise_core::types::{
    Chunk, ChunkMode, ChunkState, ChunkStatus, Job, JobStatus, RowSet, Tool,
};
use slidewise_nats::JobStorage;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{ChunkRun, ChunkWorker, PipelineConfig, TRACING_TARGET, WorkerPool};
use crate::{Error, Result};

/// Error stored on a chunk failed by the stall detector.
pub const STALLED_ERROR: &str = "No response from model (stalled).";

/// Progress line stored on a chunk failed by the stall detector.
pub const STALLED_PROGRESS: &str = "Failed: stalled without response";

/// Progress line of a chunk reset by [`JobOrchestrator::retry_chunk`].
pub const RETRY_LABEL: &str = "Retrying...";

/// Progress line of a chunk reset by [`JobOrchestrator::recheck_chunk`].
pub const RECHECK_LABEL: &str = "Re-checking...";

/// A job together with the states of its chunks.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job: Job,
    pub chunks: BTreeMap<String, ChunkState>,
}

/// Cancellation handle of a submitted chunk attempt.
#[derive(Debug)]
struct RunHandle {
    ticket: u64,
    cancel: CancellationToken,
}

struct OrchestratorInner {
    storage: JobStorage,
    completion: CompletionService,
    extractor: Arc<dyn SlideExtractor>,
    pool: WorkerPool,
    config: PipelineConfig,
    runs: Mutex<HashMap<(Uuid, String), RunHandle>>,
    next_ticket: AtomicU64,
}

/// Drives jobs from upload to merged result.
///
/// All job and chunk state lives in [`JobStorage`]; the orchestrator only
/// keeps cancellation handles of submitted chunk attempts, so a stalled
/// attempt can be abandoned and a retried chunk never runs twice at once.
///
/// Cloning is cheap; clones share the pool and the handles.
#[derive(Clone)]
pub struct JobOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl std::fmt::Debug for JobOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOrchestrator")
            .field("storage", &self.inner.storage)
            .field("completion", &self.inner.completion)
            .field("pool", &self.inner.pool)
            .finish_non_exhaustive()
    }
}

impl JobOrchestrator {
    /// Creates an orchestrator with its own worker pool.
    pub fn new(
        storage: JobStorage,
        completion: CompletionService,
        extractor: Arc<dyn SlideExtractor>,
        config: PipelineConfig,
    ) -> Self {
        let pool = WorkerPool::new(config.max_workers);
        Self {
            inner: Arc::new(OrchestratorInner {
                storage,
                completion,
                extractor,
                pool,
                config,
                runs: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the job storage.
    pub fn storage(&self) -> &JobStorage {
        &self.inner.storage
    }

    /// Returns the completion service.
    pub fn completion(&self) -> &CompletionService {
        &self.inner.completion
    }

    /// Returns the slide extractor.
    pub fn extractor(&self) -> &dyn SlideExtractor {
        self.inner.extractor.as_ref()
    }

    /// Returns the worker pool.
    pub fn pool(&self) -> &WorkerPool {
        &self.inner.pool
    }

    /// Returns the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Stores a freshly uploaded deck as a job in `UPLOADING`.
    #[tracing::instrument(skip(self, source), target = TRACING_TARGET)]
    pub async fn create_job(&self, tool: Tool, filename: &str, source: &str) -> Result<Job> {
        let job = Job::new(tool, filename);
        self.inner.storage.create_job(&job, source).await?;

        tracing::info!(
            target: TRACING_TARGET,
            job_id = %job.job_id,
            tool = %tool,
            filename = %job.filename,
            "Job created"
        );
        Ok(job)
    }

    /// Moves an uploaded job to `PARSING` and prepares it in the background.
    ///
    /// Unknown models fall back to the default. Fails with a conflict if the
    /// job already started.
    #[tracing::instrument(skip(self), target = TRACING_TARGET)]
    pub async fn start_run(
        &self,
        job_id: Uuid,
        mode: Option<ChunkMode>,
        model: Option<&str>,
    ) -> Result<Job> {
        let model = resolve_model(model);
        let mut claimed = false;

        let job = self
            .inner
            .storage
            .update_job(job_id, |job| {
                claimed = job.status == JobStatus::Uploading;
                if claimed {
                    job.status = JobStatus::Parsing;
                    job.mode = mode.unwrap_or(job.mode);
                    job.model = model.to_owned();
                }
                claimed
            })
            .await?
            .ok_or_else(|| Error::not_found("Job not found").with_resource("job"))?;

        if !claimed {
            return Err(
                Error::conflict(format!("Job already started, status is {}", job.status))
                    .with_resource("job"),
            );
        }

        tracing::info!(
            target: TRACING_TARGET,
            job_id = %job_id,
            mode = %job.mode,
            model = %job.model,
            "Run started"
        );

        let this = self.clone();
        self.inner.pool.spawn_task(async move {
            if let Err(error) = this.prepare(job_id).await {
                tracing::error!(
                    target: TRACING_TARGET,
                    job_id = %job_id,
                    error = %error,
                    "Run preparation failed"
                );
                if let Err(error) = this.fail_job(job_id, error.message().to_owned()).await {
                    tracing::error!(
                        target: TRACING_TARGET,
                        job_id = %job_id,
                        error = %error,
                        "Failed to record run failure"
                    );
                }
            }
        });

        Ok(job)
    }

    /// Extracts, chunks and submits a job in `PARSING`.
    async fn prepare(&self, job_id: Uuid) -> Result<()> {
        let storage = &self.inner.storage;
        let Some(job) = storage.get_job(job_id).await? else {
            return Ok(());
        };

        let Some(source) = storage.get_deck(job_id).await? else {
            self.fail_job(job_id, "Uploaded deck is no longer available")
                .await?;
            return Ok(());
        };

        let slides = match self.inner.extractor.extract(source.as_bytes()) {
            Ok(slides) => slides,
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    job_id = %job_id,
                    error = %error,
                    "Slide extraction failed"
                );
                self.fail_job(job_id, error.user_message()).await?;
                return Ok(());
            }
        };

        let slides_count = slides.len();
        let mut chunking = false;
        storage
            .update_job(job_id, |job| {
                chunking = job.status == JobStatus::Parsing;
                if chunking {
                    job.status = JobStatus::Chunking;
                    job.slides_count = slides_count;
                }
                chunking
            })
            .await?;

        if !chunking {
            return Ok(());
        }
        storage.delete_deck(job_id).await?;

        let chunks = chunk_slides(&slides, job.mode, job.tool.namespace());
        tracing::info!(
            target: TRACING_TARGET,
            job_id = %job_id,
            slides = slides_count,
            chunks = chunks.len(),
            "Deck chunked"
        );

        if chunks.is_empty() {
            storage
                .update_job(job_id, |job| {
                    if job.status != JobStatus::Chunking {
                        return false;
                    }
                    job.status = JobStatus::Done;
                    job.result_rows = RowSet::empty(job.tool);
                    job.no_edits = true;
                    job.thinking_progress = 100;
                    job.completion_time = Some(Timestamp::now());
                    true
                })
                .await?;

            tracing::info!(
                target: TRACING_TARGET,
                job_id = %job_id,
                "Deck has no reviewable text, job done"
            );
            return Ok(());
        }

        for chunk in &chunks {
            storage.set_chunk_payload(job_id, job.tool, chunk).await?;
        }

        let descriptors: Vec<Chunk> = chunks.iter().map(Chunk::descriptor).collect();
        let chunks_total = chunks.len();
        let mut recorded = false;
        storage
            .update_job(job_id, |job| {
                recorded = job.status == JobStatus::Chunking;
                if recorded {
                    job.chunks.clone_from(&descriptors);
                    job.chunks_total = chunks_total;
                    job.status = JobStatus::Thinking;
                }
                recorded
            })
            .await?;

        if !recorded {
            return Ok(());
        }

        for chunk in chunks {
            self.submit(job_id, job.tool, chunk, &job.model);
        }

        self.update_progress(job_id).await?;
        Ok(())
    }

    /// Queues one attempt of `chunk` on the worker pool.
    fn submit(&self, job_id: Uuid, tool: Tool, chunk: Chunk, model: &str) {
        let inner = &self.inner;
        let chunk_id = chunk.chunk_id.clone();
        let ticket = inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        let cancel = inner.pool.cancellation_token().child_token();

        let previous = self.lock_runs().insert(
            (job_id, chunk_id.clone()),
            RunHandle {
                ticket,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        let worker = ChunkWorker::new(
            inner.storage.clone(),
            inner.completion.clone(),
            inner.config.clone(),
            job_id,
            tool,
            chunk,
            model,
            cancel,
        );

        tracing::debug!(
            target: TRACING_TARGET,
            job_id = %job_id,
            chunk_id = %chunk_id,
            "Chunk submitted"
        );

        let this = self.clone();
        inner.pool.submit(async move {
            match worker.run().await {
                Ok(ChunkRun::Cancelled) => {
                    this.release(job_id, &chunk_id, ticket);
                    return;
                }
                Ok(_) => {}
                Err(error) => tracing::error!(
                    target: TRACING_TARGET,
                    job_id = %job_id,
                    chunk_id = %chunk_id,
                    error = %error,
                    "Chunk worker failed"
                ),
            }

            this.release(job_id, &chunk_id, ticket);
            this.settle(job_id).await;
        });
    }

    /// Resets a concluded chunk and runs it again.
    pub async fn retry_chunk(&self, job_id: Uuid, chunk_id: &str) -> Result<ChunkState> {
        self.resubmit(job_id, chunk_id, RETRY_LABEL).await
    }

    /// Resets a concluded chunk and asks the model to review it again.
    pub async fn recheck_chunk(&self, job_id: Uuid, chunk_id: &str) -> Result<ChunkState> {
        self.resubmit(job_id, chunk_id, RECHECK_LABEL).await
    }

    #[tracing::instrument(skip(self), target = TRACING_TARGET)]
    async fn resubmit(&self, job_id: Uuid, chunk_id: &str, label: &str) -> Result<ChunkState> {
        let storage = &self.inner.storage;
        let job = storage
            .get_job(job_id)
            .await?
            .ok_or_else(|| Error::not_found("Job not found").with_resource("job"))?;
        let descriptor = job
            .chunk(chunk_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Chunk not found").with_resource("chunk"))?;
        let payload = storage
            .get_chunk_payload(job_id, chunk_id)
            .await?
            .ok_or_else(|| {
                Error::not_found("Chunk slides are no longer available").with_resource("chunk")
            })?;
        let chunk = descriptor.with_payload(payload);

        let tool = job.tool;
        let mut active = None;
        let reset = storage
            .update_chunk_result(job_id, chunk_id, |state| {
                if state.status.is_active() {
                    active = Some(state.status);
                    return false;
                }
                active = None;
                *state = ChunkState::starting(tool, &chunk, state.attempts);
                state.ai_progress = label.to_owned();
                true
            })
            .await?;

        let state = match reset {
            Some(_) if active.is_some() => return Err(self.reject_active(job_id, chunk_id)),
            Some(state) => state,
            None if self.is_submitted(job_id, chunk_id) => {
                return Err(self.reject_active(job_id, chunk_id));
            }
            None => {
                let mut state = ChunkState::starting(tool, &chunk, 0);
                state.ai_progress = label.to_owned();
                storage.set_chunk_result(job_id, &state).await?;
                state
            }
        };

        storage
            .update_job(job_id, |job| {
                job.status = JobStatus::Thinking;
                job.no_edits = false;
                job.completion_time = None;
                true
            })
            .await?;

        tracing::info!(
            target: TRACING_TARGET,
            job_id = %job_id,
            chunk_id = %chunk_id,
            label,
            "Chunk resubmitted"
        );

        self.submit(job_id, tool, chunk, &job.model);
        self.update_progress(job_id).await?;
        Ok(state)
    }

    fn reject_active(&self, job_id: Uuid, chunk_id: &str) -> Error {
        tracing::warn!(
            target: TRACING_TARGET,
            job_id = %job_id,
            chunk_id = %chunk_id,
            "Resubmission rejected, chunk is still running"
        );
        Error::conflict("Chunk is still running").with_resource("chunk")
    }

    /// Fails stalled chunks and recomputes the job counters.
    ///
    /// Returns `None` for an unknown job.
    pub async fn update_progress(&self, job_id: Uuid) -> Result<Option<Job>> {
        let storage = &self.inner.storage;
        let mut states = storage.get_chunk_results(job_id).await?;
        self.recover_stalled(job_id, &mut states).await?;

        let sent = states
            .values()
            .filter(|state| state.status != ChunkStatus::Starting)
            .count();
        let completed = states
            .values()
            .filter(|state| state.status == ChunkStatus::Completed)
            .count();
        let failed = states
            .values()
            .filter(|state| state.status == ChunkStatus::Failed)
            .count();
        let progress = match sent {
            0 => 0,
            sent => u8::try_from(completed * 100 / sent).unwrap_or(100),
        };

        let job = storage
            .update_job(job_id, |job| {
                let status = if !job.status.is_concluding() && sent > 0 && job.chunks_total > 0 {
                    JobStatus::Thinking
                } else {
                    job.status
                };

                let changed = job.chunks_sent != sent
                    || job.chunks_completed != completed
                    || job.chunks_failed != failed
                    || job.thinking_progress != progress
                    || job.status != status;
                if changed {
                    job.chunks_sent = sent;
                    job.chunks_completed = completed;
                    job.chunks_failed = failed;
                    job.thinking_progress = progress;
                    job.status = status;
                }
                changed
            })
            .await?;

        Ok(job)
    }

    /// Stall detector: fails every active chunk idle past the threshold.
    async fn recover_stalled(
        &self,
        job_id: Uuid,
        states: &mut BTreeMap<String, ChunkState>,
    ) -> Result<()> {
        let threshold = self.inner.config.stall_threshold();
        let now = Timestamp::now();
        let stalled: Vec<(String, u32)> = states
            .values()
            .filter(|state| state.is_stalled(now, threshold))
            .map(|state| (state.chunk_id.clone(), state.attempts))
            .collect();

        for (chunk_id, attempt) in stalled {
            let mut recovered = false;
            let updated = self
                .inner
                .storage
                .update_chunk_result(job_id, &chunk_id, |state| {
                    recovered =
                        state.attempts == attempt && state.is_stalled(Timestamp::now(), threshold);
                    if recovered {
                        state.mark_failed(STALLED_ERROR);
                        state.ai_progress = STALLED_PROGRESS.to_owned();
                    }
                    recovered
                })
                .await?;

            if !recovered {
                continue;
            }

            if let Some(handle) = self.lock_runs().get(&(job_id, chunk_id.clone())) {
                handle.cancel.cancel();
            }

            tracing::warn!(
                target: TRACING_TARGET,
                job_id = %job_id,
                chunk_id = %chunk_id,
                attempt,
                threshold_secs = threshold.as_secs(),
                "Stalled chunk failed"
            );

            if let Some(state) = updated {
                states.insert(chunk_id, state);
            }
        }

        Ok(())
    }

    /// Merges the rows once every chunk has concluded.
    ///
    /// The merge is claimed by moving the job from `PROMPTING/THINKING` to
    /// `MERGING`, so racing callers merge at most once. A `MERGING` claim
    /// idle for longer than the stall threshold belongs to a process that
    /// died before writing `DONE` and is claimed again. Returns the finished
    /// job if this call merged it.
    pub async fn attempt_merge(&self, job_id: Uuid) -> Result<Option<Job>> {
        let storage = &self.inner.storage;
        let threshold = self.inner.config.stall_threshold();
        let mut claimed = false;
        let mut reclaimed = false;
        let job = storage
            .update_job(job_id, |job| {
                reclaimed = job.status == JobStatus::Merging
                    && idle_longer_than(job.last_update, threshold);
                claimed = (job.status == JobStatus::Thinking || reclaimed)
                    && job.chunks_total > 0
                    && job.merge_gate_open();
                if claimed {
                    job.status = JobStatus::Merging;
                }
                claimed
            })
            .await?;

        let Some(job) = job.filter(|_| claimed) else {
            return Ok(None);
        };

        if reclaimed {
            tracing::warn!(
                target: TRACING_TARGET,
                job_id = %job_id,
                threshold_secs = threshold.as_secs(),
                "Abandoned merge claimed again"
            );
        }

        let states = storage.get_chunk_results(job_id).await?;
        let concluded = job.chunks.iter().all(|chunk| {
            states
                .get(&chunk.chunk_id)
                .is_some_and(|state| state.status.is_terminal())
        });

        if !concluded {
            storage
                .update_job(job_id, |job| {
                    let reopen = job.status == JobStatus::Merging;
                    if reopen {
                        job.status = JobStatus::Thinking;
                    }
                    reopen
                })
                .await?;
            return Ok(None);
        }

        let rows = merge_rows(
            job.tool,
            states
                .values()
                .filter(|state| state.status == ChunkStatus::Completed)
                .map(|state| &state.rows),
        );
        let no_edits = rows.is_empty();
        let row_count = rows.len();

        let mut finished = false;
        let job = storage
            .update_job(job_id, |job| {
                finished = job.status == JobStatus::Merging;
                if finished {
                    job.status = JobStatus::Done;
                    job.result_rows = rows.clone();
                    job.no_edits = no_edits;
                    job.thinking_progress = 100;
                    job.completion_time = Some(Timestamp::now());
                }
                finished
            })
            .await?;

        if !finished {
            return Ok(None);
        }

        tracing::info!(
            target: TRACING_TARGET,
            job_id = %job_id,
            rows = row_count,
            no_edits,
            "Job merged"
        );
        Ok(job)
    }

    /// Recomputes progress and tries to merge, logging storage errors.
    pub(crate) async fn settle(&self, job_id: Uuid) {
        let result = async {
            self.update_progress(job_id).await?;
            self.attempt_merge(job_id).await
        }
        .await;

        if let Err(error) = result {
            tracing::error!(
                target: TRACING_TARGET,
                job_id = %job_id,
                error = %error,
                "Failed to settle job progress"
            );
        }
    }

    /// Returns a job with its chunk states after refreshing its progress.
    pub async fn snapshot(&self, job_id: Uuid) -> Result<JobSnapshot> {
        self.update_progress(job_id)
            .await?
            .ok_or_else(|| Error::not_found("Job not found").with_resource("job"))?;
        self.attempt_merge(job_id).await?;

        let storage = &self.inner.storage;
        let job = storage
            .get_job(job_id)
            .await?
            .ok_or_else(|| Error::not_found("Job not found").with_resource("job"))?;
        let chunks = storage.get_chunk_results(job_id).await?;
        Ok(JobSnapshot { job, chunks })
    }

    /// Cancels the job's running chunks and deletes its records.
    ///
    /// Returns false if the job did not exist.
    pub async fn cleanup_job(&self, job_id: Uuid) -> Result<bool> {
        let cancelled = {
            let mut runs = self.lock_runs();
            let keys: Vec<_> = runs.keys().filter(|(id, _)| *id == job_id).cloned().collect();
            keys.into_iter()
                .filter_map(|key| runs.remove(&key))
                .inspect(|handle| handle.cancel.cancel())
                .count()
        };

        let existed = self.inner.storage.cleanup_job(job_id).await?;
        tracing::info!(
            target: TRACING_TARGET,
            job_id = %job_id,
            cancelled,
            existed,
            "Job deleted"
        );
        Ok(existed)
    }

    /// Moves a job to `ERROR` unless it already concluded.
    async fn fail_job(&self, job_id: Uuid, message: impl Into<String> + Send) -> Result<()> {
        let message = message.into();
        self.inner
            .storage
            .update_job(job_id, |job| {
                if job.status.is_terminal() {
                    return false;
                }
                job.fail(message.as_str());
                true
            })
            .await?;

        tracing::error!(
            target: TRACING_TARGET,
            job_id = %job_id,
            error = %message,
            "Job failed"
        );
        Ok(())
    }

    /// Cancels all running work and waits up to `timeout` for it to stop.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.inner.pool.shutdown(timeout).await
    }

    fn is_submitted(&self, job_id: Uuid, chunk_id: &str) -> bool {
        self.lock_runs()
            .contains_key(&(job_id, chunk_id.to_owned()))
    }

    fn release(&self, job_id: Uuid, chunk_id: &str, ticket: u64) {
        let mut runs = self.lock_runs();
        let key = (job_id, chunk_id.to_owned());
        if runs.get(&key).is_some_and(|handle| handle.ticket == ticket) {
            runs.remove(&key);
        }
    }

    fn lock_runs(&self) -> std::sync::MutexGuard<'_, HashMap<(Uuid, String), RunHandle>> {
        self.inner
            .runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns true if `last_update` lies further back than `threshold`.
fn idle_longer_than(last_update: Timestamp, threshold: Duration) -> bool {
    let idle = Timestamp::now().duration_since(last_update);
    idle.as_secs_f64() > threshold.as_secs_f64()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use slidewise_core::completion::{MockProvider, MockReply};
    use slidewise_core::extract::JsonSlideExtractor;
    use slidewise_core::types::TableOutcome;
    use slidewise_nats::kv::{KvBackend, MemoryKvBackend};

    use super::*;

    fn deck(texts: &[&str]) -> String {
        let slides: Vec<_> = texts
            .iter()
            .enumerate()
            .map(|(index, text)| {
                json!({
                    "slide_number": index + 1,
                    "elements": [{"id": format!("e{index}"), "type": "Body", "text": text}],
                })
            })
            .collect();
        serde_json::to_string(&slides).unwrap()
    }

    fn long_text(marker: &str) -> String {
        let filler = "the quarterly results show steady growth across every region ".repeat(700);
        format!("{marker} {filler}")
    }

    fn orchestrator(provider: MockProvider, config: PipelineConfig) -> JobOrchestrator {
        orchestrator_with_storage(provider, config, JobStorage::in_memory())
    }

    fn orchestrator_with_storage(
        provider: MockProvider,
        config: PipelineConfig,
        storage: JobStorage,
    ) -> JobOrchestrator {
        JobOrchestrator::new(
            storage,
            CompletionService::new(provider),
            Arc::new(JsonSlideExtractor::default()),
            config,
        )
    }

    fn table(page: u32, original: &str, revised: &str) -> MockReply {
        MockReply::text(format!(
            "| Page | Original | Revised |\n|---|---|---|\n| {page} | {original} | {revised} |\n"
        ))
    }

    async fn wait_for(
        orchestrator: &JobOrchestrator,
        job_id: Uuid,
        done: impl Fn(&JobSnapshot) -> bool,
    ) -> JobSnapshot {
        for _ in 0..200 {
            let snapshot = orchestrator.snapshot(job_id).await.unwrap();
            if done(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {job_id} did not reach the expected state");
    }

    async fn run(orchestrator: &JobOrchestrator, source: String) -> Uuid {
        let job = orchestrator
            .create_job(Tool::WordingRevision, "deck.json", &source)
            .await
            .unwrap();
        orchestrator
            .start_run(job.job_id, Some(ChunkMode::Precise), Some("GPT-5"))
            .await
            .unwrap();
        job.job_id
    }

    fn is_terminal(snapshot: &JobSnapshot) -> bool {
        snapshot.job.status.is_terminal()
    }

    #[tokio::test]
    async fn test_chunks_merge_into_done() {
        let provider = MockProvider::default()
            .when_contains("Alpha", table(1, "Alpha is grate", "Alpha is great"))
            .when_contains("Bravo", table(2, "Bravo wins", "Bravo prevails"));
        let orchestrator = orchestrator(provider, PipelineConfig::new());
        let job_id = run(&orchestrator, deck(&[&long_text("Alpha"), &long_text("Bravo")])).await;

        let snapshot = wait_for(&orchestrator, job_id, is_terminal).await;
        let job = snapshot.job;
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.model, "gpt-5");
        assert_eq!(job.mode, ChunkMode::Precise);
        assert_eq!(job.slides_count, 2);
        assert_eq!(job.chunks_total, 2);
        assert_eq!(job.chunks_completed, 2);
        assert_eq!(job.thinking_progress, 100);
        assert_eq!(job.result_rows.len(), 2);
        assert!(!job.no_edits);
        assert!(job.completion_time.is_some());

        let storage = orchestrator.storage();
        assert!(storage.get_deck(job_id).await.unwrap().is_none());
        assert!(job.chunks.iter().all(|chunk| chunk.payload.is_empty()));
        let payload = storage
            .get_chunk_payload(job_id, "wr_0002")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload[0].slide_number, 2);
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_block_merge() {
        let provider = MockProvider::default()
            .when_contains("Alpha", table(1, "Alpha is grate", "Alpha is great"))
            .when_contains("Bravo", MockReply::fail_after(["| Page |"], "connection reset"));
        let orchestrator = orchestrator(provider, PipelineConfig::new());
        let job_id = run(&orchestrator, deck(&[&long_text("Alpha"), &long_text("Bravo")])).await;

        let snapshot = wait_for(&orchestrator, job_id, is_terminal).await;
        assert_eq!(snapshot.job.status, JobStatus::Done);
        assert_eq!(snapshot.job.chunks_failed, 1);
        assert_eq!(snapshot.job.chunks_completed, 1);
        assert_eq!(snapshot.job.result_rows.len(), 1);

        let failed = &snapshot.chunks["wr_0002"];
        assert_eq!(failed.status, ChunkStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("connection reset"));
    }

    #[tokio::test]
    async fn test_retry_merges_without_duplicates() {
        let provider = MockProvider::default()
            .when_contains("Alpha", table(1, "Alpha is grate", "Alpha is great"))
            .once_when_contains("Bravo", MockReply::fail_after(["| Page |"], "connection reset"))
            .when_contains("Bravo", table(2, "Bravo wins", "Bravo prevails"));
        let orchestrator = orchestrator(provider, PipelineConfig::new());
        let job_id = run(&orchestrator, deck(&[&long_text("Alpha"), &long_text("Bravo")])).await;
        wait_for(&orchestrator, job_id, is_terminal).await;

        let state = orchestrator.retry_chunk(job_id, "wr_0002").await.unwrap();
        assert_eq!(state.ai_progress, RETRY_LABEL);
        assert_eq!(state.status, ChunkStatus::Starting);

        let snapshot = wait_for(&orchestrator, job_id, |snapshot| {
            is_terminal(snapshot) && snapshot.job.chunks_completed == 2
        })
        .await;
        assert_eq!(snapshot.job.result_rows.len(), 2);
        assert_eq!(snapshot.job.chunks_failed, 0);
        assert_eq!(snapshot.chunks["wr_0002"].attempts, 2);
        assert_eq!(snapshot.chunks["wr_0001"].attempts, 1);
    }

    #[tokio::test]
    async fn test_retry_rejected_while_active() {
        let provider = MockProvider::new(MockReply::stall(["| Page |"]));
        let orchestrator = orchestrator(provider, PipelineConfig::new());
        let job_id = run(&orchestrator, deck(&[&long_text("Alpha")])).await;

        wait_for(&orchestrator, job_id, |snapshot| {
            snapshot.chunks.values().any(|state| state.status == ChunkStatus::Processing)
        })
        .await;

        let error = orchestrator.recheck_chunk(job_id, "wr_0001").await.unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::Conflict);

        let error = orchestrator.retry_chunk(job_id, "wr_0009").await.unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::NotFound);

        assert!(orchestrator.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_stalled_chunk_is_failed() {
        let provider = MockProvider::new(MockReply::stall(["| Page |"]));
        let config = PipelineConfig::new().with_stall_threshold(Duration::from_secs(1));
        let orchestrator = orchestrator(provider, config);
        let job_id = run(&orchestrator, deck(&[&long_text("Alpha")])).await;

        let snapshot = wait_for(&orchestrator, job_id, is_terminal).await;
        assert_eq!(snapshot.job.status, JobStatus::Done);
        assert!(snapshot.job.no_edits);
        assert_eq!(snapshot.job.chunks_failed, 1);

        let stalled = &snapshot.chunks["wr_0001"];
        assert_eq!(stalled.status, ChunkStatus::Failed);
        assert_eq!(stalled.error.as_deref(), Some(STALLED_ERROR));
        assert_eq!(stalled.ai_progress, STALLED_PROGRESS);
        assert_eq!(stalled.streaming_output, "| Page |");
    }

    #[tokio::test]
    async fn test_empty_deck_is_done_without_edits() {
        let orchestrator = orchestrator(MockProvider::default(), PipelineConfig::new());
        let job_id = run(&orchestrator, deck(&["Too short"])).await;

        let snapshot = wait_for(&orchestrator, job_id, is_terminal).await;
        assert_eq!(snapshot.job.status, JobStatus::Done);
        assert!(snapshot.job.no_edits);
        assert_eq!(snapshot.job.chunks_total, 0);
        assert_eq!(orchestrator.completion().provider_name(), "mock");
    }

    #[tokio::test]
    async fn test_unreadable_deck_is_error() {
        let orchestrator = orchestrator(MockProvider::default(), PipelineConfig::new());
        let job_id = run(&orchestrator, "not a deck".to_owned()).await;

        let snapshot = wait_for(&orchestrator, job_id, is_terminal).await;
        assert_eq!(snapshot.job.status, JobStatus::Error);
        assert!(
            snapshot
                .job
                .error
                .as_deref()
                .is_some_and(|error| error.starts_with("could not read slide deck"))
        );
    }

    #[tokio::test]
    async fn test_run_twice_conflicts() {
        let orchestrator = orchestrator(MockProvider::default(), PipelineConfig::new());
        let job_id = run(&orchestrator, deck(&["Too short"])).await;

        let error = orchestrator.start_run(job_id, None, None).await.unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::Conflict);

        let error = orchestrator.start_run(Uuid::nil(), None, None).await.unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_merge_runs_once() {
        let orchestrator = orchestrator(MockProvider::default(), PipelineConfig::new());
        let job_id = run(&orchestrator, deck(&[&long_text("Alpha")])).await;
        let snapshot = wait_for(&orchestrator, job_id, is_terminal).await;
        assert_eq!(snapshot.chunks["wr_0001"].outcome, Some(TableOutcome::NoEdits));

        assert!(orchestrator.attempt_merge(job_id).await.unwrap().is_none());
        assert!(orchestrator.cleanup_job(job_id).await.unwrap());
        assert!(orchestrator.storage().get_job(job_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slide_review_job_uses_its_namespace() {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryKvBackend::new("test"));
        let orchestrator = orchestrator_with_storage(
            MockProvider::default(),
            PipelineConfig::new(),
            JobStorage::with_backend(backend.clone()),
        );

        let source = deck(&[&long_text("Alpha")]);
        let job = orchestrator
            .create_job(Tool::SlideReview, "deck.json", &source)
            .await
            .unwrap();
        orchestrator.start_run(job.job_id, None, None).await.unwrap();
        let snapshot = wait_for(&orchestrator, job.job_id, is_terminal).await;
        assert_eq!(snapshot.job.tool, Tool::SlideReview);
        assert!(snapshot.chunks.contains_key("sr_0001"));

        let job_id = job.job_id.to_string();
        let keys = backend.keys("sr_").await.unwrap();
        assert!(keys.contains(&format!("sr_job.{job_id}")));
        assert!(keys.contains(&format!("sr_result.{job_id}.sr_0001")));
        assert!(keys.contains(&format!("sr_payload.{job_id}.sr_0001")));
        let foreign = backend.keys("wr_").await.unwrap();
        assert!(foreign.iter().all(|key| !key.contains(&job_id)));
    }

    #[tokio::test]
    async fn test_abandoned_merge_is_claimed_again() {
        let config = PipelineConfig::new().with_stall_threshold(Duration::from_secs(1));
        let orchestrator = orchestrator(MockProvider::default(), config);
        let job_id = run(&orchestrator, deck(&[&long_text("Alpha")])).await;
        wait_for(&orchestrator, job_id, is_terminal).await;

        // A claimant that died between the MERGING claim and the DONE write.
        orchestrator
            .storage()
            .update_job(job_id, |job| {
                job.status = JobStatus::Merging;
                job.completion_time = None;
                true
            })
            .await
            .unwrap();
        assert!(orchestrator.attempt_merge(job_id).await.unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(orchestrator.sweep().await.unwrap(), 1);

        let job = orchestrator.storage().get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.no_edits);
        assert!(job.completion_time.is_some());
    }
}
