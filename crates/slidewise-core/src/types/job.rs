//! Job records.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::{Chunk, ChunkMode, RowSet, Tool};

/// Aggregate status of a job.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString, AsRefStr)]
pub enum JobStatus {
    /// The deck was uploaded and awaits a run.
    #[default]
    #[serde(rename = "UPLOADING")]
    #[strum(serialize = "UPLOADING")]
    Uploading,
    /// Slides are being extracted.
    #[serde(rename = "PARSING")]
    #[strum(serialize = "PARSING")]
    Parsing,
    /// Slides are being split into chunks.
    #[serde(rename = "CHUNKING")]
    #[strum(serialize = "CHUNKING")]
    Chunking,
    /// Chunks are in flight.
    #[serde(rename = "PROMPTING/THINKING")]
    #[strum(serialize = "PROMPTING/THINKING")]
    Thinking,
    /// All chunks concluded; rows are being merged.
    #[serde(rename = "MERGING")]
    #[strum(serialize = "MERGING")]
    Merging,
    /// Final rows are available.
    #[serde(rename = "DONE")]
    #[strum(serialize = "DONE")]
    Done,
    /// The job failed before any chunk could run.
    #[serde(rename = "ERROR")]
    #[strum(serialize = "ERROR")]
    Error,
}

impl JobStatus {
    /// Returns true for `DONE` and `ERROR`.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Returns true once the merge step has started or the job is over.
    #[inline]
    pub const fn is_concluding(self) -> bool {
        matches!(self, Self::Merging | Self::Done | Self::Error)
    }
}

/// A review job over one uploaded deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub tool: Tool,
    pub status: JobStatus,
    pub filename: String,
    pub mode: ChunkMode,
    pub model: String,
    pub slides_count: usize,
    /// Chunk descriptors without their payloads.
    pub chunks: Vec<Chunk>,
    pub chunks_total: usize,
    pub chunks_sent: usize,
    pub chunks_completed: usize,
    pub chunks_failed: usize,
    /// Completed chunks as a percentage of sent chunks.
    pub thinking_progress: u8,
    pub result_rows: RowSet,
    pub no_edits: bool,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub completion_time: Option<Timestamp>,
    pub last_update: Timestamp,
}

impl Job {
    /// Creates a job for a freshly uploaded deck.
    pub fn new(tool: Tool, filename: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            job_id: Uuid::new_v4(),
            tool,
            status: JobStatus::Uploading,
            filename: filename.into(),
            mode: ChunkMode::default(),
            model: String::new(),
            slides_count: 0,
            chunks: Vec::new(),
            chunks_total: 0,
            chunks_sent: 0,
            chunks_completed: 0,
            chunks_failed: 0,
            thinking_progress: 0,
            result_rows: RowSet::empty(tool),
            no_edits: false,
            error: None,
            created_at: now,
            completion_time: None,
            last_update: now,
        }
    }

    /// Stamps `last_update` without letting it move backward.
    pub fn touch(&mut self) {
        self.last_update = Timestamp::now().max(self.last_update);
    }

    /// Returns the chunk descriptor with the given id.
    pub fn chunk(&self, chunk_id: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|chunk| chunk.chunk_id == chunk_id)
    }

    /// Returns true once every chunk has concluded, successfully or not.
    #[inline]
    pub fn merge_gate_open(&self) -> bool {
        self.chunks_completed + self.chunks_failed == self.chunks_total
    }

    /// Moves the job to `ERROR` with a user-visible message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Error;
        self.error = Some(message.into());
        self.completion_time = Some(Timestamp::now());
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels() {
        assert_eq!(JobStatus::Thinking.to_string(), "PROMPTING/THINKING");
        let json = serde_json::to_string(&JobStatus::Done).unwrap();
        assert_eq!(json, "\"DONE\"");
        assert!(JobStatus::Error.is_terminal());
        assert!(!JobStatus::Merging.is_terminal());
    }

    #[test]
    fn touch_never_moves_backward() {
        let mut job = Job::new(Tool::WordingRevision, "deck.json");
        let future = Timestamp::now() + jiff::SignedDuration::from_secs(3600);
        job.last_update = future;
        job.touch();
        assert_eq!(job.last_update, future);
    }

    #[test]
    fn serialized_by_tool() {
        let job = Job::new(Tool::SlideReview, "deck.json");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["tool"], "sr");
        assert_eq!(json["status"], "UPLOADING");
        assert_eq!(json["result_rows"]["schema"], "reviews");
    }
}
