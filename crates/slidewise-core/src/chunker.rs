//! Splits a deck into bounded chunks.
//!
//! Slides are added to a buffer in slide-number order. When the next slide
//! would push the buffer over the word or page limits of the preset, the
//! buffer is emitted and a new one is seeded with its trailing overlap
//! slides. A single slide larger than the word limit still forms a chunk of
//! its own.

use std::sync::LazyLock;

use regex::Regex;

use crate::TRACING_TARGET_CHUNKER;
use crate::types::{Chunk, ChunkConfig, ChunkMode, Slide};

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z']+").expect("valid word regex"));

/// Counts words in `text`.
pub fn count_words(text: &str) -> usize {
    WORD_RE.find_iter(text).count()
}

fn slide_words(slide: &Slide) -> usize {
    slide.texts().map(count_words).sum()
}

/// Splits `slides` into chunks using the preset of `mode`.
///
/// Chunk ids are `{prefix}_{index:04}` starting at 1.
pub fn chunk_slides(slides: &[Slide], mode: ChunkMode, prefix: &str) -> Vec<Chunk> {
    chunk_slides_with(slides, mode, mode.config(), prefix)
}

/// Splits `slides` into chunks using explicit limits.
pub fn chunk_slides_with(
    slides: &[Slide],
    mode: ChunkMode,
    config: ChunkConfig,
    prefix: &str,
) -> Vec<Chunk> {
    let mut sorted: Vec<(&Slide, usize)> = slides.iter().map(|s| (s, slide_words(s))).collect();
    sorted.sort_by_key(|(slide, _)| slide.slide_number);

    let mut chunks = Vec::new();
    let mut buffer: Vec<(&Slide, usize)> = Vec::new();

    for (slide, words) in sorted {
        if let Some((first, _)) = buffer.first() {
            let buffered: usize = buffer.iter().map(|(_, w)| w).sum();
            let span = slide.slide_number.saturating_sub(first.slide_number) + 1;

            if buffered + words > config.word_max || span > config.page_max {
                chunks.push(make_chunk(&buffer, mode, prefix, chunks.len() + 1));
                buffer = overlap_seed(&buffer, slide, words, &config);
            }
        }

        buffer.push((slide, words));
    }

    if !buffer.is_empty() {
        chunks.push(make_chunk(&buffer, mode, prefix, chunks.len() + 1));
    }

    tracing::debug!(
        target: TRACING_TARGET_CHUNKER,
        slides = slides.len(),
        chunks = chunks.len(),
        mode = %mode,
        "Chunked slides"
    );

    chunks
}

/// Trailing slides of the closed buffer that still fit next to `next`.
///
/// The overlap shrinks until the seeded buffer plus `next` respects both
/// limits, so only a lone slide can ever exceed `word_max`.
fn overlap_seed<'a>(
    closed: &[(&'a Slide, usize)],
    next: &Slide,
    next_words: usize,
    config: &ChunkConfig,
) -> Vec<(&'a Slide, usize)> {
    let mut take = config.overlap_pages.min(closed.len());
    while take > 0 {
        let seed = &closed[closed.len() - take..];
        let words: usize = seed.iter().map(|(_, w)| w).sum::<usize>() + next_words;
        let span = next.slide_number.saturating_sub(seed[0].0.slide_number) + 1;
        if words <= config.word_max && span <= config.page_max {
            return seed.to_vec();
        }
        take -= 1;
    }

    Vec::new()
}

fn make_chunk(buffer: &[(&Slide, usize)], mode: ChunkMode, prefix: &str, index: usize) -> Chunk {
    let page_numbers: Vec<u32> = buffer.iter().map(|(s, _)| s.slide_number).collect();
    Chunk {
        chunk_id: format!("{prefix}_{index:04}"),
        page_start: page_numbers.first().copied().unwrap_or_default(),
        page_end: page_numbers.last().copied().unwrap_or_default(),
        page_numbers,
        mode,
        word_count: buffer.iter().map(|(_, w)| w).sum(),
        payload: buffer.iter().map(|(s, _)| (*s).clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ElementKind, SlideElement};

    fn slide(number: u32, words: usize) -> Slide {
        let text = vec!["word"; words].join(" ");
        Slide::new(number, vec![SlideElement::new("e", ElementKind::Body, text)])
    }

    #[test]
    fn counts_words_with_apostrophes() {
        assert_eq!(count_words("It's a 3-step plan, isn't it?"), 6);
        assert_eq!(count_words("12% 0.70 23"), 0);
    }

    #[test]
    fn empty_deck_has_no_chunks() {
        assert!(chunk_slides(&[], ChunkMode::Fast, "wr").is_empty());
    }

    #[test]
    fn twelve_slides_of_six_hundred_words() {
        let slides: Vec<_> = (1..=12).map(|n| slide(n, 600)).collect();
        let chunks = chunk_slides(&slides, ChunkMode::Fast, "wr");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_id, "wr_0001");
        assert_eq!(chunks[0].page_numbers, (1..=10).collect::<Vec<_>>());
        assert_eq!(chunks[0].word_count, 6000);
        assert_eq!(chunks[1].chunk_id, "wr_0002");
        assert_eq!(chunks[1].page_start, chunks[0].page_end);
        assert_eq!(chunks[1].page_numbers, vec![10, 11, 12]);
    }

    #[test]
    fn oversized_slide_is_its_own_chunk() {
        let slides = vec![slide(1, 100), slide(2, 9000), slide(3, 100)];
        let chunks = chunk_slides(&slides, ChunkMode::Fast, "wr");

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].page_numbers, vec![2]);
        assert_eq!(chunks[1].word_count, 9000);
        for chunk in &chunks {
            assert!(chunk.word_count <= 6500 || chunk.len() == 1);
        }
    }

    #[test]
    fn overlap_yields_to_word_limit() {
        let slides = vec![
            slide(1, 3000),
            slide(2, 3000),
            slide(3, 4000),
            slide(4, 100),
            slide(5, 100),
        ];
        let chunks = chunk_slides(&slides, ChunkMode::Fast, "wr");

        // Seeding slide 2 next to slide 3 would make a 7000-word chunk.
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].page_numbers, vec![1, 2]);
        assert_eq!(chunks[1].page_numbers, vec![3, 4, 5]);
        assert_eq!(chunks[1].word_count, 4200);
        for chunk in &chunks {
            assert!(chunk.word_count <= 6500 || chunk.len() == 1);
        }

        let slides = vec![slide(1, 3000), slide(2, 3000), slide(3, 1000)];
        let chunks = chunk_slides(&slides, ChunkMode::Fast, "wr");
        assert_eq!(chunks[0].page_numbers, vec![1, 2]);
        assert_eq!(chunks[1].page_numbers, vec![2, 3]);
    }

    #[test]
    fn page_span_limit_closes_chunks() {
        let slides: Vec<_> = (1..=20).map(|n| slide(n, 10)).collect();
        let chunks = chunk_slides(&slides, ChunkMode::Precise, "wr");

        assert_eq!(chunks[0].page_numbers, (1..=8).collect::<Vec<_>>());
        assert_eq!(chunks[1].page_start, 8);
        for chunk in &chunks {
            assert!(chunk.page_end - chunk.page_start + 1 <= 8);
        }

        let covered: std::collections::BTreeSet<u32> = chunks
            .iter()
            .flat_map(|c| c.page_numbers.iter().copied())
            .collect();
        assert_eq!(covered.len(), 20);
    }

    #[test]
    fn unsorted_input_is_ordered_and_deterministic() {
        let slides = vec![slide(3, 5), slide(1, 5), slide(2, 5)];
        let first = chunk_slides(&slides, ChunkMode::Fast, "sr");
        let second = chunk_slides(&slides, ChunkMode::Fast, "sr");

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].page_numbers, vec![1, 2, 3]);
        assert_eq!(first[0].chunk_id, "sr_0001");
    }
}
