//! Path parameters.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `/jobs/{job_id}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JobPathParams {
    pub job_id: Uuid,
}

/// `/jobs/{job_id}/chunks/{chunk_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPathParams {
    pub job_id: Uuid,
    pub chunk_id: String,
}
