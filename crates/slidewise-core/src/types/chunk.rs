//! Chunk descriptors and chunking presets.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::Slide;

/// Chunking preset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ChunkMode {
    /// Larger chunks, higher throughput.
    #[default]
    Fast,
    /// Smaller chunks, tighter context windows.
    Precise,
}

impl ChunkMode {
    /// Returns the size limits for this preset.
    #[must_use]
    pub const fn config(self) -> ChunkConfig {
        match self {
            Self::Fast => ChunkConfig::FAST,
            Self::Precise => ChunkConfig::PRECISE,
        }
    }
}

/// Size limits applied by the chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Soft lower bound; chunks may close below it.
    pub word_min: usize,
    /// Hard upper bound unless a single slide exceeds it alone.
    pub word_max: usize,
    /// Maximum page span of a chunk.
    pub page_max: u32,
    /// Trailing slides carried into the next chunk.
    pub overlap_pages: usize,
}

impl ChunkConfig {
    /// Preset for [`ChunkMode::Fast`].
    pub const FAST: Self = Self {
        word_min: 4000,
        word_max: 6500,
        page_max: 15,
        overlap_pages: 1,
    };

    /// Preset for [`ChunkMode::Precise`].
    pub const PRECISE: Self = Self {
        word_min: 2500,
        word_max: 4000,
        page_max: 8,
        overlap_pages: 1,
    };
}

/// An immutable unit of work submitted to the model.
///
/// Created once by the chunker and re-submitted verbatim on retry. Job
/// records keep only the descriptor; the payload is stored on its own and
/// reattached with [`Chunk::with_payload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier within the job, e.g. `wr_0001`.
    pub chunk_id: String,
    /// First slide number in the payload.
    pub page_start: u32,
    /// Last slide number in the payload.
    pub page_end: u32,
    /// Slide numbers in payload order.
    pub page_numbers: Vec<u32>,
    /// Preset that produced this chunk.
    pub mode: ChunkMode,
    /// Total word count of the payload.
    pub word_count: usize,
    /// Slides sent to the model; empty on a detached descriptor.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payload: Vec<Slide>,
}

impl Chunk {
    /// Returns the number of slides in the chunk.
    #[inline]
    pub fn len(&self) -> usize {
        self.page_numbers.len()
    }

    /// Returns true if the chunk covers no slides.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.page_numbers.is_empty()
    }

    /// Returns the descriptor without its slides.
    #[must_use]
    pub fn descriptor(&self) -> Self {
        Self {
            chunk_id: self.chunk_id.clone(),
            page_start: self.page_start,
            page_end: self.page_end,
            page_numbers: self.page_numbers.clone(),
            mode: self.mode,
            word_count: self.word_count,
            payload: Vec::new(),
        }
    }

    /// Reattaches the slides of a detached descriptor.
    #[must_use]
    pub fn with_payload(mut self, payload: Vec<Slide>) -> Self {
        self.payload = payload;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Precise".parse::<ChunkMode>().unwrap(), ChunkMode::Precise);
        assert_eq!(ChunkMode::Fast.to_string(), "fast");
        assert!("turbo".parse::<ChunkMode>().is_err());
    }

    #[test]
    fn descriptor_drops_payload_only() {
        let chunk = Chunk {
            chunk_id: "wr_0001".into(),
            page_start: 3,
            page_end: 4,
            page_numbers: vec![3, 4],
            mode: ChunkMode::Precise,
            word_count: 12,
            payload: vec![Slide::new(3, vec![]), Slide::new(4, vec![])],
        };

        let descriptor = chunk.descriptor();
        assert!(descriptor.payload.is_empty());
        assert_eq!(descriptor.len(), 2);

        let json = serde_json::to_value(&descriptor).unwrap();
        assert!(json.get("payload").is_none());
        let parsed: Chunk = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, descriptor);

        assert_eq!(descriptor.with_payload(chunk.payload.clone()), chunk);
    }

    #[test]
    fn presets() {
        assert_eq!(ChunkMode::Fast.config().word_max, 6500);
        assert_eq!(ChunkMode::Precise.config().page_max, 8);
    }
}
