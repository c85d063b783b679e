//! Job request types.

use serde::{Deserialize, Serialize};
use slidewise_core::export::ExportFormat;
use slidewise_core::types::ChunkMode;

/// Request payload for starting a run.
///
/// Both fields are optional: the mode defaults to `fast` and an unknown or
/// missing model falls back to the default model.
#[must_use]
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RunJob {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl RunJob {
    /// Parses the requested mode, case-insensitively.
    ///
    /// Unknown values yield `None`, which selects the default mode.
    pub fn chunk_mode(&self) -> Option<ChunkMode> {
        self.mode.as_deref().and_then(|mode| mode.trim().parse().ok())
    }
}

/// Query parameters of the result download.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct ResultQuery {
    #[serde(default)]
    pub format: ExportFormat,
    /// Adds the chunk states to a JSON result.
    #[serde(default)]
    pub include_raw: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_mode_parsing() {
        let request = RunJob {
            mode: Some("Precise".into()),
            model: None,
        };
        assert_eq!(request.chunk_mode(), Some(ChunkMode::Precise));

        assert_eq!(RunJob::default().chunk_mode(), None);

        let request = RunJob {
            mode: Some("turbo".into()),
            model: None,
        };
        assert_eq!(request.chunk_mode(), None);
    }
}
