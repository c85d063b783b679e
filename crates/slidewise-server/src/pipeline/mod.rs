//! Chunked review pipeline.
//!
//! - [`WorkerPool`] bounds how many chunks stream at once and owns the
//!   cancellation token used on shutdown.
//! - [`ChunkWorker`] drives one chunk attempt: start, send, stream, parse,
//!   conclude.
//! - [`JobOrchestrator`] starts runs, submits chunks, recomputes progress,
//!   fails stalled chunks and merges the rows once every chunk concluded.
//!
//! Every piece of job state lives in [`slidewise_nats::JobStorage`]; the
//! pipeline itself only keeps task and cancellation handles.

/// Tracing target for pipeline events.
const TRACING_TARGET: &str = "slidewise_server::pipeline";

mod config;
mod orchestrator;
mod pool;
mod sweeper;
mod worker;

pub use config::{
    DEFAULT_MAX_WORKERS, DEFAULT_STALL_SWEEP_INTERVAL_SECS, DEFAULT_STALL_THRESHOLD_SECS,
    DEFAULT_STREAM_IDLE_TIMEOUT_SECS, PipelineConfig,
};
pub use orchestrator::{
    JobOrchestrator, JobSnapshot, RECHECK_LABEL, RETRY_LABEL, STALLED_ERROR, STALLED_PROGRESS,
};
pub use pool::WorkerPool;
pub use worker::{CANCELLED_ERROR, ChunkRun, ChunkWorker};
