//! Review tools supported by the pipeline.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// A review tool; determines the prompt, the row schema and the storage
/// namespace of a job.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter)]
pub enum Tool {
    /// Selective sentence polishing, rows of `Page | Original | Revised`.
    #[default]
    #[serde(rename = "wr")]
    #[strum(serialize = "wr")]
    WordingRevision,
    /// Per-slide issue review, rows of `Page | Spelling | Grammar | Logic`.
    #[serde(rename = "sr")]
    #[strum(serialize = "sr")]
    SlideReview,
}

impl Tool {
    /// Short namespace used for storage keys, chunk ids and file names.
    #[must_use]
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::WordingRevision => "wr",
            Self::SlideReview => "sr",
        }
    }

    /// Column headers of the result table.
    #[must_use]
    pub const fn headers(self) -> &'static [&'static str] {
        match self {
            Self::WordingRevision => &["Page", "Original", "Revised"],
            Self::SlideReview => &["Page", "Spelling", "Grammar", "Logic"],
        }
    }

    /// Worksheet title used by the spreadsheet export.
    #[must_use]
    pub const fn sheet_name(self) -> &'static str {
        match self {
            Self::WordingRevision => "Wording Revision",
            Self::SlideReview => "Slide Review",
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn namespace_matches_serialized_name() {
        for tool in Tool::iter() {
            assert_eq!(tool.as_ref(), tool.namespace());
            assert_eq!(tool.namespace().parse::<Tool>().unwrap(), tool);
        }
    }
}
