//! Slide records produced by extraction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a text-bearing element on a slide.
///
/// Serialized as the label the prompts refer to (`"Title/Subtitle"`,
/// `"Body"`, `"Table"`); unknown labels are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementKind {
    /// Title or subtitle placeholder.
    Title,
    /// Free text body.
    #[default]
    Body,
    /// Table cells, one `Row ?, Col ?: ...` line per cell.
    Table,
    /// Any other label.
    Other(String),
}

impl ElementKind {
    /// Returns the serialized label.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Title => "Title/Subtitle",
            Self::Body => "Body",
            Self::Table => "Table",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for ElementKind {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Title/Subtitle" | "Title" | "Subtitle" => Self::Title,
            "Body" => Self::Body,
            "Table" => Self::Table,
            _ => Self::Other(label),
        }
    }
}

impl From<ElementKind> for String {
    fn from(kind: ElementKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single text element of a slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideElement {
    /// Opaque element identifier.
    pub id: String,
    /// Element kind.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Element text, lines separated by `\n`.
    pub text: String,
}

impl SlideElement {
    /// Creates a new element.
    pub fn new(id: impl Into<String>, kind: ElementKind, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            text: text.into(),
        }
    }
}

/// A slide with its reviewable elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// One-based slide number; canonical document order.
    pub slide_number: u32,
    /// Elements in reading order.
    pub elements: Vec<SlideElement>,
}

impl Slide {
    /// Creates a new slide.
    pub fn new(slide_number: u32, elements: Vec<SlideElement>) -> Self {
        Self {
            slide_number,
            elements,
        }
    }

    /// Iterates over the text of every element.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|element| element.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_kind_labels() {
        let element = SlideElement::new("a1", ElementKind::Title, "Hello");
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(json["type"], "Title/Subtitle");

        let parsed: SlideElement =
            serde_json::from_str(r#"{"id":"x","type":"Chart","text":"t"}"#).unwrap();
        assert_eq!(parsed.kind, ElementKind::Other("Chart".into()));
        assert_eq!(parsed.kind.to_string(), "Chart");
    }
}
