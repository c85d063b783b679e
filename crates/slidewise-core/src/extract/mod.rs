//! Slide extraction seam.
//!
//! An extractor turns an uploaded deck into slide records holding only the
//! lines worth reviewing. Decoding presentation archives is left to
//! implementations outside this crate.

mod filter;
mod json;

pub use filter::{is_candidate_text, normalize_table_line, split_lines};
pub use json::JsonSlideExtractor;

use crate::Result;
use crate::types::Slide;

/// Converts an uploaded deck into reviewable slides.
pub trait SlideExtractor: Send + Sync {
    /// Extracts slides from the raw upload.
    ///
    /// Fails with an extraction error when the deck is unreadable. A deck
    /// without reviewable text yields no slides.
    fn extract(&self, source: &[u8]) -> Result<Vec<Slide>>;

    /// File extensions accepted by this extractor, without the dot.
    fn extensions(&self) -> &'static [&'static str];
}
