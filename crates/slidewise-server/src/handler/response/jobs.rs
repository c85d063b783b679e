use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use slidewise_core::types::{
    ChunkMode, ChunkState, Job, JobStatus, ResultRow, ReviewRow, RowSet, Tool,
};
use uuid::Uuid;

/// Response returned after a deck upload.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreated {
    pub job_id: Uuid,
    pub tool: Tool,
    pub status: JobStatus,
    pub filename: String,
}

impl From<Job> for JobCreated {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.job_id,
            tool: job.tool,
            status: job.status,
            filename: job.filename,
        }
    }
}

/// Job counters and status without chunk payloads or result rows.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: Uuid,
    pub tool: Tool,
    pub status: JobStatus,
    pub filename: String,
    pub mode: ChunkMode,
    pub model: String,
    pub slides_count: usize,
    pub chunks_total: usize,
    pub chunks_sent: usize,
    pub chunks_completed: usize,
    pub chunks_failed: usize,
    /// Completed chunks as a percentage of chunks sent.
    pub thinking_progress: u8,
    pub no_edits: bool,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub completion_time: Option<Timestamp>,
    pub last_update: Timestamp,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.job_id,
            tool: job.tool,
            status: job.status,
            filename: job.filename,
            mode: job.mode,
            model: job.model,
            slides_count: job.slides_count,
            chunks_total: job.chunks_total,
            chunks_sent: job.chunks_sent,
            chunks_completed: job.chunks_completed,
            chunks_failed: job.chunks_failed,
            thinking_progress: job.thinking_progress,
            no_edits: job.no_edits,
            error: job.error,
            created_at: job.created_at,
            completion_time: job.completion_time,
            last_update: job.last_update,
        }
    }
}

/// Polling response: the job plus every chunk state keyed by chunk id.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job: JobView,
    pub chunks: BTreeMap<String, ChunkState>,
}

/// Full job record including chunk descriptors and result rows.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDebug {
    pub job: Job,
    pub chunks: BTreeMap<String, ChunkState>,
}

/// Rows serialized as a plain list in the schema of the job's tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultRows {
    Revisions(Vec<ResultRow>),
    Reviews(Vec<ReviewRow>),
}

impl From<RowSet> for ResultRows {
    fn from(rows: RowSet) -> Self {
        match rows {
            RowSet::Revisions(rows) => Self::Revisions(rows),
            RowSet::Reviews(rows) => Self::Reviews(rows),
        }
    }
}

impl ResultRows {
    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Revisions(rows) => rows.len(),
            Self::Reviews(rows) => rows.len(),
        }
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// JSON rendering of a job result.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub rows: ResultRows,
    pub no_edits: bool,
    /// Chunk states, present when `include_raw=true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_chunks: Option<BTreeMap<String, ChunkState>>,
}
