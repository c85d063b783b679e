//! Result rows parsed from model output.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::Tool;

/// One wording revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultRow {
    /// Slide number the sentence appears on.
    pub page: u32,
    /// Sentence as it appears on the slide.
    pub original: String,
    /// Suggested replacement.
    pub revised: String,
}

impl ResultRow {
    /// Creates a new revision row.
    pub fn new(page: u32, original: impl Into<String>, revised: impl Into<String>) -> Self {
        Self {
            page,
            original: original.into(),
            revised: revised.into(),
        }
    }
}

/// Issues reported for one slide by the review tool.
///
/// Each column is a comma-separated list; an empty string means no issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewRow {
    /// Slide number.
    pub page: u32,
    /// Spelling issues.
    pub spelling: String,
    /// Grammar issues.
    pub grammar: String,
    /// Logic or consistency issues.
    pub logic: String,
}

impl ReviewRow {
    /// Returns true if no column carries an issue.
    pub fn is_blank(&self) -> bool {
        self.spelling.is_empty() && self.grammar.is_empty() && self.logic.is_empty()
    }
}

/// Rows of either tool schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schema", content = "items", rename_all = "snake_case")]
pub enum RowSet {
    /// Wording revision rows.
    Revisions(Vec<ResultRow>),
    /// Slide review rows.
    Reviews(Vec<ReviewRow>),
}

impl RowSet {
    /// Returns an empty set for the given tool.
    pub fn empty(tool: Tool) -> Self {
        match tool {
            Tool::WordingRevision => Self::Revisions(Vec::new()),
            Tool::SlideReview => Self::Reviews(Vec::new()),
        }
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Revisions(rows) => rows.len(),
            Self::Reviews(rows) => rows.len(),
        }
    }

    /// Returns true if the set has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the tool whose schema these rows follow.
    pub fn tool(&self) -> Tool {
        match self {
            Self::Revisions(_) => Tool::WordingRevision,
            Self::Reviews(_) => Tool::SlideReview,
        }
    }

    /// Appends rows of the same schema; rows of the other schema are ignored.
    pub fn extend_from(&mut self, other: &RowSet) {
        match (self, other) {
            (Self::Revisions(rows), Self::Revisions(more)) => rows.extend(more.iter().cloned()),
            (Self::Reviews(rows), Self::Reviews(more)) => rows.extend(more.iter().cloned()),
            _ => {}
        }
    }

    /// Renders every row as cells, in the column order of the tool headers.
    pub fn to_records(&self) -> Vec<Vec<String>> {
        match self {
            Self::Revisions(rows) => rows
                .iter()
                .map(|r| vec![r.page.to_string(), r.original.clone(), r.revised.clone()])
                .collect(),
            Self::Reviews(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        r.page.to_string(),
                        r.spelling.clone(),
                        r.grammar.clone(),
                        r.logic.clone(),
                    ]
                })
                .collect(),
        }
    }
}

/// How the model's answer was interpreted.
///
/// A chunk is `completed` in all three cases; the outcome tells apart
/// "nothing to report" from "could not understand the answer".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TableOutcome {
    /// A result table was found.
    Rows,
    /// The model answered with the no-edits sentinel.
    NoEdits,
    /// No result table could be located.
    Unrecognized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_set_serializes_with_schema_tag() {
        let set = RowSet::Revisions(vec![ResultRow::new(3, "a b", "c")]);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["schema"], "revisions");
        assert_eq!(json["items"][0]["page"], 3);

        let back: RowSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn extend_ignores_other_schema() {
        let mut set = RowSet::empty(Tool::WordingRevision);
        set.extend_from(&RowSet::Reviews(vec![ReviewRow::default()]));
        assert!(set.is_empty());
        set.extend_from(&RowSet::Revisions(vec![ResultRow::new(1, "x", "y")]));
        assert_eq!(set.len(), 1);
    }
}
