//! Tolerant markdown table parsing.

use std::sync::LazyLock;

use regex::Regex;

use crate::TRACING_TARGET_TABLE;
use crate::types::{ResultRow, ReviewRow, RowSet, TableOutcome, Tool};

/// Exact answer meaning "nothing to report".
pub const NO_EDITS_SENTINEL: &str = "No edits recommended.";

static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid think regex"));
static PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpage").expect("valid page regex"));
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\|?\s*:?-{2,}").expect("valid separator regex"));

/// Rows parsed from one model answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    pub rows: RowSet,
    pub outcome: TableOutcome,
}

impl ParsedTable {
    fn empty(tool: Tool, outcome: TableOutcome) -> Self {
        Self {
            rows: RowSet::empty(tool),
            outcome,
        }
    }
}

/// Parses the model's answer for `tool`.
///
/// Never fails: malformed rows are skipped and an answer without a
/// recognizable header yields [`TableOutcome::Unrecognized`].
pub fn parse_table(tool: Tool, text: &str) -> ParsedTable {
    let cleaned = clean_text(text);
    if cleaned.eq_ignore_ascii_case(NO_EDITS_SENTINEL) {
        return ParsedTable::empty(tool, TableOutcome::NoEdits);
    }

    let lines: Vec<&str> = cleaned
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let Some(header) = lines.iter().position(|line| is_header(tool, line)) else {
        tracing::debug!(
            target: TRACING_TARGET_TABLE,
            tool = %tool,
            length = text.len(),
            "No result table found in model output"
        );
        return ParsedTable::empty(tool, TableOutcome::Unrecognized);
    };

    let width = tool.headers().len();
    let body = lines[header + 1..]
        .iter()
        .filter(|line| line.contains('|') && !SEPARATOR_RE.is_match(line))
        .map(|line| smart_split(line, width))
        .filter(|cells| cells.len() >= width);

    let rows = match tool {
        Tool::WordingRevision => RowSet::Revisions(body.filter_map(revision_row).collect()),
        Tool::SlideReview => RowSet::Reviews(body.filter_map(review_row).collect()),
    };

    tracing::debug!(
        target: TRACING_TARGET_TABLE,
        tool = %tool,
        rows = rows.len(),
        "Parsed result table"
    );

    ParsedTable {
        rows,
        outcome: TableOutcome::Rows,
    }
}

fn clean_text(text: &str) -> String {
    THINK_RE
        .replace_all(text, "")
        .replace("Answer:", "")
        .replace("answer:", "")
        .trim()
        .to_owned()
}

fn is_header(tool: Tool, line: &str) -> bool {
    let lowered = line.to_lowercase();
    match tool {
        Tool::WordingRevision => {
            PAGE_RE.is_match(line) && lowered.contains("original") && lowered.contains("revised")
        }
        Tool::SlideReview => lowered.contains("page") && lowered.contains("spelling"),
    }
}

/// Splits a table line into at most `width` cells.
///
/// Surplus cells come from literal pipes inside a cell; they are folded back
/// into the last middle column so the first and last columns stay aligned.
fn smart_split(line: &str, width: usize) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);

    let parts: Vec<&str> = trimmed.split('|').map(str::trim).collect();
    if parts.len() <= width || width < 3 {
        return parts.into_iter().map(str::to_owned).collect();
    }

    let last = parts.len() - 1;
    let folded_from = width - 2;
    let mut cells: Vec<String> = parts[..folded_from].iter().map(|p| (*p).to_owned()).collect();
    cells.push(parts[folded_from..last].join("|").trim().to_owned());
    cells.push(parts[last].to_owned());
    cells
}

fn parse_page(cell: &str) -> Option<u32> {
    cell.trim()
        .trim_end_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .ok()
}

fn is_blank_cell(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty()
        || cell.chars().all(|c| matches!(c, '-' | '–' | '—'))
        || cell.eq_ignore_ascii_case("none")
        || cell.eq_ignore_ascii_case("n/a")
}

fn revision_row(cells: Vec<String>) -> Option<ResultRow> {
    let page = parse_page(&cells[0])?;
    let (original, revised) = (cells[1].trim(), cells[2].trim());
    if is_blank_cell(original) || is_blank_cell(revised) {
        return None;
    }

    Some(ResultRow::new(page, original, revised))
}

fn review_row(cells: Vec<String>) -> Option<ReviewRow> {
    let page = parse_page(&cells[0])?;
    let column = |cell: &str| {
        if is_blank_cell(cell) {
            String::new()
        } else {
            cell.trim().to_owned()
        }
    };

    let row = ReviewRow {
        page,
        spelling: column(&cells[1]),
        grammar: column(&cells[2]),
        logic: column(&cells[3]),
    };

    (!row.is_blank()).then_some(row)
}
