//! Candidate line filtering.

use std::sync::LazyLock;

use regex::Regex;

use crate::chunker::count_words;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://|www\.").expect("valid url regex"));
static NOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^note\s*:").expect("valid note regex"));
static EXPORT_ARTIFACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+_\d+").expect("valid artifact regex"));
static METRIC_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s%$,.;:()\-]+").expect("valid metric regex"));

const TABLE_HEADER_KEYWORDS: &[&str] = &[
    "time to value",
    "size of prize",
    "cost bucket",
    "owner",
    "status",
    "timeline",
    "priority",
];

/// Splits text on newlines and vertical tabs, dropping blank lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split(['\n', '\r', '\u{000b}'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Returns the cell text after its first colon, if any.
pub fn normalize_table_line(line: &str) -> &str {
    match line.split_once(':') {
        Some((_, rest)) => rest.trim(),
        None => line.trim(),
    }
}

fn is_metrics_only(text: &str) -> bool {
    let cleaned = METRIC_NOISE_RE.replace_all(text, " ");
    !cleaned.chars().any(|c| c.is_ascii_alphabetic())
}

fn is_table_header(text: &str) -> bool {
    let lowered = text.to_lowercase();
    TABLE_HEADER_KEYWORDS.iter().any(|key| lowered.contains(key)) && count_words(text) <= 6
}

/// Returns true if the line is worth sending to the model.
pub fn is_candidate_text(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() || URL_RE.is_match(text) || EXPORT_ARTIFACT_RE.is_match(text) {
        return false;
    }

    let words = count_words(text);
    if NOTE_RE.is_match(text) && words < 10 {
        return false;
    }

    words >= 5 && !is_metrics_only(text) && !is_table_header(text)
}
