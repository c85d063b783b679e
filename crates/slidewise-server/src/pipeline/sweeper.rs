//! Background stall sweep.

use slidewise_core::types::Job;

use super::{JobOrchestrator, TRACING_TARGET};
use crate::Result;

impl JobOrchestrator {
    /// Settles every job that has not concluded yet.
    ///
    /// Runs the stall detector and the merge gate for jobs nobody polls, so
    /// a job whose last worker hung still finishes. A `MERGING` job whose
    /// claimant died is merged again once its claim goes stale. Returns the
    /// number of jobs visited.
    pub async fn sweep(&self) -> Result<usize> {
        let jobs: Vec<Job> = self
            .storage()
            .list_jobs()
            .await?
            .into_iter()
            .filter(|job| !job.status.is_terminal() && job.chunks_total > 0)
            .collect();

        for job in &jobs {
            self.settle(job.job_id).await;
        }

        tracing::debug!(target: TRACING_TARGET, jobs = jobs.len(), "Stall sweep finished");
        Ok(jobs.len())
    }

    /// Starts the periodic sweep on the worker pool.
    ///
    /// The sweep stops when the pool shuts down.
    pub fn spawn_sweeper(&self) {
        let this = self.clone();
        let cancel = self.pool().cancellation_token();
        let interval = self.config().stall_sweep_interval();

        tracing::info!(
            target: TRACING_TARGET,
            interval_secs = interval.as_secs(),
            threshold_secs = self.config().stall_threshold().as_secs(),
            "Starting stall sweeper"
        );

        self.pool().spawn_task(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if let Err(error) = this.sweep().await {
                    tracing::error!(
                        target: TRACING_TARGET,
                        error = %error,
                        "Stall sweep failed"
                    );
                }
            }

            tracing::debug!(target: TRACING_TARGET, "Stall sweeper stopped");
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use slidewise_core::completion::{CompletionService, MockProvider, MockReply};
    use slidewise_core::extract::JsonSlideExtractor;
    use slidewise_core::types::{ChunkStatus, JobStatus, Tool};
    use slidewise_nats::JobStorage;

    use super::*;
    use crate::pipeline::{PipelineConfig, STALLED_ERROR};

    #[tokio::test]
    async fn test_sweeper_finishes_unpolled_stalled_job() {
        let config = PipelineConfig::new()
            .with_stall_threshold(Duration::from_secs(1))
            .with_stall_sweep_interval(Duration::from_secs(1));
        let orchestrator = JobOrchestrator::new(
            JobStorage::in_memory(),
            CompletionService::new(MockProvider::new(MockReply::stall(["| Page |"]))),
            Arc::new(JsonSlideExtractor),
            config,
        );

        let text = "every slide in this deck needs a careful review ".repeat(20);
        let source = serde_json::json!([
            {"slide_number": 1, "elements": [{"id": "a", "type": "Body", "text": text}]}
        ])
        .to_string();
        let job = orchestrator
            .create_job(Tool::WordingRevision, "deck.json", &source)
            .await
            .unwrap();
        orchestrator.start_run(job.job_id, None, None).await.unwrap();
        orchestrator.spawn_sweeper();

        let mut finished = None;
        for _ in 0..80 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let stored = orchestrator.storage().get_job(job.job_id).await.unwrap().unwrap();
            if stored.status == JobStatus::Done {
                finished = Some(stored);
                break;
            }
        }

        let finished = finished.expect("sweeper should finish the job");
        assert_eq!(finished.chunks_failed, 1);

        let state = orchestrator
            .storage()
            .get_chunk_result(job.job_id, "wr_0001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.status, ChunkStatus::Failed);
        assert_eq!(state.error.as_deref(), Some(STALLED_ERROR));

        assert!(orchestrator.shutdown(Duration::from_secs(1)).await);
    }
}
