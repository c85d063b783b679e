//! Data model shared by the chunker, storage and the pipeline.
//!
//! Records in this module are plain serde structs with a fixed field set and
//! explicit status enums, so anything read back from storage is validated by
//! deserialization instead of being trusted as an arbitrary map.

mod chunk;
mod chunk_state;
mod job;
mod row;
mod slide;
mod tool;

pub use chunk::{Chunk, ChunkConfig, ChunkMode};
pub use chunk_state::{ChunkState, ChunkStatus};
pub use job::{Job, JobStatus};
pub use row::{ResultRow, ReviewRow, RowSet, TableOutcome};
pub use slide::{ElementKind, Slide, SlideElement};
pub use tool::Tool;
