//! Mutable per-chunk execution state.

use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::{Chunk, ChunkMode, RowSet, TableOutcome, Tool};

/// Lifecycle of one chunk attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChunkStatus {
    Starting,
    Sending,
    Processing,
    Completed,
    Failed,
}

impl ChunkStatus {
    /// Returns true while a worker owns the chunk.
    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Sending | Self::Processing)
    }

    /// Returns true once the attempt concluded.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// State of a chunk keyed by `(job_id, chunk_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkState {
    pub chunk_id: String,
    pub status: ChunkStatus,
    pub page_start: u32,
    pub page_end: u32,
    pub page_numbers: Vec<u32>,
    pub word_count: usize,
    pub mode: ChunkMode,
    /// Monotonic attempt counter, never reset by retries.
    pub attempts: u32,
    pub start_time: Timestamp,
    pub completion_time: Option<Timestamp>,
    /// Text received so far, in arrival order.
    pub streaming_output: String,
    /// Human-readable progress line.
    pub ai_progress: String,
    /// Final text once the stream ended.
    pub result_text: String,
    pub rows: RowSet,
    pub outcome: Option<TableOutcome>,
    pub error: Option<String>,
    pub last_update: Timestamp,
}

impl ChunkState {
    /// Initial state of an attempt.
    pub fn starting(tool: Tool, chunk: &Chunk, attempts: u32) -> Self {
        let now = Timestamp::now();
        Self {
            chunk_id: chunk.chunk_id.clone(),
            status: ChunkStatus::Starting,
            page_start: chunk.page_start,
            page_end: chunk.page_end,
            page_numbers: chunk.page_numbers.clone(),
            word_count: chunk.word_count,
            mode: chunk.mode,
            attempts,
            start_time: now,
            completion_time: None,
            streaming_output: String::new(),
            ai_progress: "Initializing...".to_owned(),
            result_text: String::new(),
            rows: RowSet::empty(tool),
            outcome: None,
            error: None,
            last_update: now,
        }
    }

    /// Stamps `last_update` without letting it move backward.
    pub fn touch(&mut self) {
        self.last_update = Timestamp::now().max(self.last_update);
    }

    /// Marks the request as dispatched.
    pub fn mark_sending(&mut self) {
        self.status = ChunkStatus::Sending;
        self.ai_progress = "Sending prompt to model...".to_owned();
        self.touch();
    }

    /// Marks the stream as open.
    pub fn mark_processing(&mut self) {
        self.status = ChunkStatus::Processing;
        self.ai_progress = "Model is generating...".to_owned();
        self.touch();
    }

    /// Replaces the streamed text received so far.
    pub fn record_output(&mut self, output: &str) {
        self.streaming_output.clear();
        self.streaming_output.push_str(output);
        self.ai_progress = "AI thinking...".to_owned();
        self.touch();
    }

    /// Concludes the attempt with parsed rows.
    pub fn mark_completed(&mut self, result_text: String, rows: RowSet, outcome: TableOutcome) {
        self.status = ChunkStatus::Completed;
        self.streaming_output.clone_from(&result_text);
        self.result_text = result_text;
        self.rows = rows;
        self.outcome = Some(outcome);
        self.error = None;
        self.ai_progress = "Completed".to_owned();
        self.completion_time = Some(Timestamp::now());
        self.touch();
    }

    /// Concludes the attempt with an error message.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.status = ChunkStatus::Failed;
        self.ai_progress = format!("Failed: {error}");
        self.error = Some(error);
        self.completion_time = Some(Timestamp::now());
        self.touch();
    }

    /// Returns true if the chunk is active and idle for longer than `threshold`.
    pub fn is_stalled(&self, now: Timestamp, threshold: Duration) -> bool {
        if !self.status.is_active() {
            return false;
        }

        let idle = now.duration_since(self.last_update);
        idle.as_secs_f64() > threshold.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;
    use crate::types::Slide;

    fn chunk() -> Chunk {
        Chunk {
            chunk_id: "wr_0001".into(),
            page_start: 1,
            page_end: 2,
            page_numbers: vec![1, 2],
            mode: ChunkMode::Fast,
            word_count: 10,
            payload: vec![Slide::new(1, vec![]), Slide::new(2, vec![])],
        }
    }

    #[test]
    fn lifecycle_transitions() {
        let mut state = ChunkState::starting(Tool::WordingRevision, &chunk(), 1);
        assert!(state.status.is_active());

        state.mark_sending();
        state.mark_processing();
        state.record_output("| Page |");
        assert_eq!(state.status, ChunkStatus::Processing);

        state.mark_failed("HTTP 502");
        assert_eq!(state.status, ChunkStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("HTTP 502"));
        assert_eq!(state.ai_progress, "Failed: HTTP 502");
        assert!(state.completion_time.is_some());
    }

    #[test]
    fn stall_detection_only_applies_to_active_chunks() {
        let mut state = ChunkState::starting(Tool::WordingRevision, &chunk(), 1);
        state.last_update = Timestamp::now() - SignedDuration::from_secs(600);

        let now = Timestamp::now();
        assert!(state.is_stalled(now, Duration::from_secs(300)));
        assert!(!state.is_stalled(now, Duration::from_secs(900)));

        state.status = ChunkStatus::Completed;
        assert!(!state.is_stalled(now, Duration::from_secs(300)));
    }
}
