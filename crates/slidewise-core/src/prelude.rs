//! Convenient re-exports for common use.

pub use crate::completion::{
    CompletionProvider, CompletionRequest, CompletionService, DeltaStream,
};
pub use crate::error::{BoxedError, Error, ErrorKind, Result};
pub use crate::extract::SlideExtractor;
pub use crate::health::{ServiceHealth, ServiceStatus};
pub use crate::types::{
    Chunk, ChunkMode, ChunkState, ChunkStatus, Job, JobStatus, RowSet, Slide, TableOutcome, Tool,
};
