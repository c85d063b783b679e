//! Reconciles rows reported by overlapping chunks.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::TRACING_TARGET_TABLE;
use crate::types::{ResultRow, ReviewRow, RowSet, Tool};

/// Lower-cases and collapses whitespace.
pub fn normalize_original(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Merges the row sets of every completed chunk, in the order given.
pub fn merge_rows<'a>(tool: Tool, sets: impl IntoIterator<Item = &'a RowSet>) -> RowSet {
    let mut all = RowSet::empty(tool);
    for set in sets {
        all.extend_from(set);
    }

    let merged = match all {
        RowSet::Revisions(rows) => RowSet::Revisions(merge_revisions(rows)),
        RowSet::Reviews(rows) => RowSet::Reviews(merge_reviews(rows)),
    };

    tracing::debug!(
        target: TRACING_TARGET_TABLE,
        tool = %tool,
        rows = merged.len(),
        "Merged chunk rows"
    );

    merged
}

/// Deduplicates revision rows on `(page, normalized original)`.
///
/// The row with the longer revision wins; equal lengths keep the
/// lexicographically greater text. Output is sorted by page and otherwise
/// keeps first-seen order.
pub fn merge_revisions(rows: Vec<ResultRow>) -> Vec<ResultRow> {
    let mut order: Vec<(u32, String)> = Vec::new();
    let mut best: HashMap<(u32, String), ResultRow> = HashMap::new();

    for row in rows {
        let key = (row.page, normalize_original(&row.original));
        match best.entry(key) {
            Entry::Vacant(slot) => {
                order.push(slot.key().clone());
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get();
                let better = (row.revised.len(), &row.revised) > (current.revised.len(), &current.revised);
                if better {
                    slot.insert(row);
                }
            }
        }
    }

    let mut merged: Vec<ResultRow> = order
        .into_iter()
        .filter_map(|key| best.remove(&key))
        .collect();
    merged.sort_by_key(|row| row.page);
    merged
}

/// Unions review issues per page and column.
///
/// Items are the comma-separated parts of a cell, deduplicated
/// case-insensitively in first-seen order.
pub fn merge_reviews(rows: Vec<ReviewRow>) -> Vec<ReviewRow> {
    let mut pages: Vec<u32> = Vec::new();
    let mut columns: HashMap<u32, [Vec<String>; 3]> = HashMap::new();

    for row in rows {
        let entry = columns.entry(row.page).or_insert_with(|| {
            pages.push(row.page);
            Default::default()
        });
        for (items, cell) in entry.iter_mut().zip([&row.spelling, &row.grammar, &row.logic]) {
            for item in cell.split(',').map(str::trim).filter(|i| !i.is_empty()) {
                if !items.iter().any(|seen| seen.eq_ignore_ascii_case(item)) {
                    items.push(item.to_owned());
                }
            }
        }
    }

    pages.sort_unstable();
    pages
        .into_iter()
        .filter_map(|page| {
            let [spelling, grammar, logic] = columns.remove(&page)?;
            Some(ReviewRow {
                page,
                spelling: spelling.join(", "),
                grammar: grammar.join(", "),
                logic: logic.join(", "),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_table;

    #[test]
    fn overlap_duplicates_keep_longer_revision() {
        let rows = vec![
            ResultRow::new(10, "Prices  expected to decline", "Prices may fall"),
            ResultRow::new(3, "Intro line", "Intro"),
            ResultRow::new(10, "prices expected to decline", "Prices will likely keep falling"),
        ];
        let merged = merge_revisions(rows);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].page, 3);
        assert_eq!(merged[1].revised, "Prices will likely keep falling");
    }

    #[test]
    fn merge_is_idempotent() {
        let rows = vec![
            ResultRow::new(2, "b", "bb"),
            ResultRow::new(1, "a", "aa"),
            ResultRow::new(2, "B", "bc"),
        ];
        let once = merge_revisions(rows);
        let twice = merge_revisions(once.clone());
        assert_eq!(
            serde_json::to_string(&once).unwrap(),
            serde_json::to_string(&twice).unwrap()
        );
    }

    #[test]
    fn rendered_table_round_trips_through_parse_and_merge() {
        let rows = vec![
            ResultRow::new(4, "Second  sentence here", "Second sentence"),
            ResultRow::new(1, "First sentence here", "First sentence"),
        ];
        let mut table = String::from("| Page | Original | Revised |\n| --- | --- | --- |\n");
        for row in &rows {
            table.push_str(&format!("| {} | {} | {} |\n", row.page, row.original, row.revised));
        }

        let parsed = parse_table(Tool::WordingRevision, &table);
        let merged = merge_rows(Tool::WordingRevision, [&parsed.rows]);
        assert_eq!(merged, RowSet::Revisions(merge_revisions(rows)));
    }

    #[test]
    fn review_issues_are_unioned_per_page() {
        let rows = vec![
            ReviewRow {
                page: 2,
                spelling: "recieve, teh".into(),
                grammar: String::new(),
                logic: "totals".into(),
            },
            ReviewRow {
                page: 1,
                spelling: String::new(),
                grammar: "they was".into(),
                logic: String::new(),
            },
            ReviewRow {
                page: 2,
                spelling: "Teh, adress".into(),
                grammar: "a apple".into(),
                logic: String::new(),
            },
        ];
        let merged = merge_reviews(rows);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].page, 1);
        assert_eq!(merged[1].spelling, "recieve, teh, adress");
        assert_eq!(merged[1].grammar, "a apple");
        assert_eq!(merged[1].logic, "totals");
    }
}
