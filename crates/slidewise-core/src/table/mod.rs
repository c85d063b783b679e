//! Model output interpretation.
//!
//! [`parse_table`] turns the model's markdown answer into typed rows and
//! records how the answer was understood; [`merge_rows`] reconciles the rows
//! of all chunks of a job into the final result.

mod merger;
mod parser;

pub use merger::{merge_reviews, merge_revisions, merge_rows, normalize_original};
pub use parser::{NO_EDITS_SENTINEL, ParsedTable, parse_table};
