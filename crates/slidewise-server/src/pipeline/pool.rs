//! Bounded pool of chunk workers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::TRACING_TARGET;

/// Runs submitted tasks with at most `max_workers` in flight.
///
/// Tasks are spawned immediately and wait for a permit inside the task, so
/// submission never blocks the caller. Every task is tracked, which lets
/// [`shutdown`](Self::shutdown) cancel queued work and wait for running work.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    max_workers: usize,
    cancel_token: CancellationToken,
    tracker: TaskTracker,
}

impl WorkerPool {
    /// Creates a pool with `max_workers` permits.
    pub fn new(max_workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            cancel_token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Queues `task` until a permit is free.
    ///
    /// Tasks still queued when the pool shuts down are dropped unrun.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        let cancel_token = self.cancel_token.clone();

        self.tracker.spawn(async move {
            let permit = tokio::select! {
                biased;
                () = cancel_token.cancelled() => {
                    tracing::debug!(target: TRACING_TARGET, "Queued task dropped on shutdown");
                    return;
                }
                permit = semaphore.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };

            task.await;
            drop(permit);
        });
    }

    /// Runs `task` immediately without taking a permit.
    ///
    /// Used for short bookkeeping tasks that must not wait behind chunks.
    pub fn spawn_task<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task);
    }

    /// Token cancelled when the pool shuts down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Returns true once shutdown has started.
    pub fn is_shutting_down(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Number of tasks running or queued.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Number of free permits.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Configured pool size.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Cancels all work and waits up to `timeout` for tasks to finish.
    ///
    /// Returns false if tasks were still running when the timeout elapsed.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        tracing::info!(
            target: TRACING_TARGET,
            in_flight = self.in_flight(),
            timeout_secs = timeout.as_secs(),
            "Shutting down worker pool"
        );

        self.cancel_token.cancel();
        self.tracker.close();

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => {
                tracing::info!(target: TRACING_TARGET, "Worker pool stopped");
                true
            }
            Err(_) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    in_flight = self.in_flight(),
                    "Worker pool shutdown timed out"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let running = running.clone();
            let peak = peak.clone();
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }

        assert!(pool.shutdown_after_idle().await);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_drops_queued_tasks() {
        let pool = WorkerPool::new(1);
        let ran = Arc::new(AtomicUsize::new(0));

        let token = pool.cancellation_token();
        pool.submit(async move { token.cancelled().await });
        for _ in 0..3 {
            let ran = ran.clone();
            pool.submit(async move {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(pool.shutdown(Duration::from_secs(1)).await);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(pool.is_shutting_down());
    }

    impl WorkerPool {
        async fn shutdown_after_idle(&self) -> bool {
            self.tracker.close();
            self.tracker.wait().await;
            self.available_permits() == self.max_workers
        }
    }
}
