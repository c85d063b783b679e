//! Chunk worker: drives one chunk attempt against the remote model.

use futures::StreamExt;
use slidewise_core::completion::{CompletionRequest, CompletionService};
use slidewise_core::prompt::build_user_message;
use slidewise_core::table::parse_table;
use slidewise_core::types::{Chunk, ChunkState, Tool};
use slidewise_nats::JobStorage;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::PipelineConfig;
use crate::Result;

/// Tracing target for chunk workers.
const TRACING_TARGET: &str = "slidewise_server::pipeline::worker";

/// Error stored when the pool shuts down under a running attempt.
pub const CANCELLED_ERROR: &str = "Cancelled during shutdown";

/// How a chunk attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRun {
    /// The stream ended and the answer was parsed.
    Completed,
    /// The attempt failed and the error was recorded.
    Failed,
    /// A newer attempt or the stall detector owns the record; nothing was written.
    Superseded,
    /// The attempt was cancelled before or while running.
    Cancelled,
}

/// One attempt of one chunk.
///
/// Every write after the start of the attempt is conditional on the record
/// still carrying this attempt's number and an active status, so a record
/// failed by the stall detector or reset by a retry is never overwritten by a
/// late result.
pub struct ChunkWorker {
    storage: JobStorage,
    completion: CompletionService,
    config: PipelineConfig,
    job_id: Uuid,
    tool: Tool,
    chunk: Chunk,
    model: String,
    cancel: CancellationToken,
}

impl ChunkWorker {
    /// Creates a worker for one attempt of `chunk`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: JobStorage,
        completion: CompletionService,
        config: PipelineConfig,
        job_id: Uuid,
        tool: Tool,
        chunk: Chunk,
        model: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            storage,
            completion,
            config,
            job_id,
            tool,
            chunk,
            model: model.into(),
            cancel,
        }
    }

    /// Runs the attempt to its end.
    ///
    /// Storage errors are returned; model and parse errors are recorded on
    /// the chunk and reported as [`ChunkRun::Failed`].
    #[tracing::instrument(
        skip(self),
        fields(job_id = %self.job_id, chunk_id = %self.chunk.chunk_id),
        target = TRACING_TARGET
    )]
    pub async fn run(self) -> Result<ChunkRun> {
        if self.cancel.is_cancelled() {
            return Ok(ChunkRun::Cancelled);
        }

        let attempt = self.begin().await?;
        tracing::debug!(target: TRACING_TARGET, attempt, "Chunk attempt started");

        let deadline = Instant::now() + self.config.request_timeout();
        let outcome = self.stream(attempt, deadline).await?;

        match outcome {
            ChunkRun::Completed => tracing::info!(
                target: TRACING_TARGET,
                job_id = %self.job_id,
                chunk_id = %self.chunk.chunk_id,
                attempt,
                "Chunk completed"
            ),
            ChunkRun::Superseded => tracing::debug!(
                target: TRACING_TARGET,
                attempt,
                "Chunk attempt superseded, result discarded"
            ),
            ChunkRun::Failed | ChunkRun::Cancelled => {}
        }

        Ok(outcome)
    }

    /// Initializes the chunk record and returns the new attempt number.
    async fn begin(&self) -> Result<u32> {
        let (tool, chunk) = (self.tool, &self.chunk);
        let updated = self
            .storage
            .update_chunk_result(self.job_id, &chunk.chunk_id, |state| {
                *state = ChunkState::starting(tool, chunk, state.attempts + 1);
                true
            })
            .await?;

        if let Some(state) = updated {
            return Ok(state.attempts);
        }

        let state = ChunkState::starting(tool, chunk, 1);
        self.storage.set_chunk_result(self.job_id, &state).await?;
        Ok(state.attempts)
    }

    async fn stream(&self, attempt: u32, deadline: Instant) -> Result<ChunkRun> {
        if !self.write(attempt, ChunkState::mark_sending).await? {
            return Ok(ChunkRun::Superseded);
        }

        let message = match build_user_message(self.tool, &self.chunk.payload) {
            Ok(message) => message,
            Err(error) => return self.fail(attempt, error.user_message()).await,
        };
        let request = CompletionRequest::user(&self.model, message);

        let opened = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return self.fail_cancelled(attempt).await,
            () = sleep_until(deadline) => return self.fail_deadline(attempt).await,
            opened = self.completion.stream(&request) => opened,
        };

        let mut deltas = match opened {
            Ok(deltas) => deltas,
            Err(error) => return self.fail(attempt, error.user_message()).await,
        };

        if !self.write(attempt, ChunkState::mark_processing).await? {
            return Ok(ChunkRun::Superseded);
        }

        let idle = self.config.stream_idle_timeout();
        let mut output = String::new();

        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return self.fail_cancelled(attempt).await,
                () = sleep_until(deadline) => return self.fail_deadline(attempt).await,
                next = timeout(idle, deltas.next()) => next,
            };

            match next {
                Err(_) => {
                    let message = format!("No response from model for {}s", idle.as_secs());
                    return self.fail(attempt, message).await;
                }
                Ok(None) => break,
                Ok(Some(Err(error))) => return self.fail(attempt, error.user_message()).await,
                Ok(Some(Ok(delta))) => {
                    output.push_str(&delta);
                    let recorded = self
                        .write(attempt, |state| state.record_output(&output))
                        .await?;
                    if !recorded {
                        return Ok(ChunkRun::Superseded);
                    }
                }
            }
        }

        let parsed = parse_table(self.tool, &output);
        tracing::debug!(
            target: TRACING_TARGET,
            rows = parsed.rows.len(),
            outcome = ?parsed.outcome,
            chars = output.len(),
            "Chunk answer parsed"
        );

        let completed = self
            .write(attempt, |state| {
                state.mark_completed(output.clone(), parsed.rows.clone(), parsed.outcome)
            })
            .await?;

        Ok(if completed {
            ChunkRun::Completed
        } else {
            ChunkRun::Superseded
        })
    }

    async fn fail(&self, attempt: u32, error: String) -> Result<ChunkRun> {
        tracing::error!(
            target: TRACING_TARGET,
            job_id = %self.job_id,
            chunk_id = %self.chunk.chunk_id,
            attempt,
            error = %error,
            "Chunk failed"
        );

        let failed = self
            .write(attempt, |state| state.mark_failed(error.as_str()))
            .await?;
        Ok(if failed {
            ChunkRun::Failed
        } else {
            ChunkRun::Superseded
        })
    }

    async fn fail_deadline(&self, attempt: u32) -> Result<ChunkRun> {
        let secs = self.config.request_timeout().as_secs();
        self.fail(attempt, format!("Model did not finish within {secs}s"))
            .await
    }

    async fn fail_cancelled(&self, attempt: u32) -> Result<ChunkRun> {
        tracing::warn!(
            target: TRACING_TARGET,
            job_id = %self.job_id,
            chunk_id = %self.chunk.chunk_id,
            attempt,
            "Chunk attempt cancelled"
        );

        self.write(attempt, |state| state.mark_failed(CANCELLED_ERROR))
            .await?;
        Ok(ChunkRun::Cancelled)
    }

    /// Applies `mutate` if the record still belongs to this active attempt.
    async fn write<F>(&self, attempt: u32, mutate: F) -> Result<bool>
    where
        F: Fn(&mut ChunkState) + Send + Sync,
    {
        let mut applied = false;
        self.storage
            .update_chunk_result(self.job_id, &self.chunk.chunk_id, |state| {
                applied = state.attempts == attempt && state.status.is_active();
                if applied {
                    mutate(state);
                }
                applied
            })
            .await?;
        Ok(applied)
    }
}
