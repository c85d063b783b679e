//! Extraction from slide deck JSON.

use serde::Deserialize;
use uuid::Uuid;

use super::SlideExtractor;
use super::filter::{is_candidate_text, normalize_table_line, split_lines};
use crate::types::{ElementKind, Slide, SlideElement};
use crate::{Error, Result, TRACING_TARGET_EXTRACT};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDeck {
    Slides(Vec<RawSlide>),
    Wrapped { slides: Vec<RawSlide> },
}

#[derive(Debug, Deserialize)]
struct RawSlide {
    slide_number: u32,
    #[serde(default)]
    elements: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default)]
    kind: ElementKind,
    #[serde(default)]
    text: String,
}

/// Reads decks exported as JSON:
/// `[{"slide_number": 1, "elements": [{"id", "type", "text"}]}]`.
///
/// Every line is run through the candidate filter; table lines are rewritten
/// as `Row ?, Col ?: <cell>`. Slides left without elements are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSlideExtractor;

impl JsonSlideExtractor {
    fn filter_element(raw: RawElement) -> Option<SlideElement> {
        let lines: Vec<String> = match raw.kind {
            ElementKind::Table => split_lines(&raw.text)
                .into_iter()
                .map(normalize_table_line)
                .filter(|cell| is_candidate_text(cell))
                .map(|cell| format!("Row ?, Col ?: {cell}"))
                .collect(),
            _ => split_lines(&raw.text)
                .into_iter()
                .filter(|line| is_candidate_text(line))
                .map(str::to_owned)
                .collect(),
        };

        if lines.is_empty() {
            return None;
        }

        let id = raw
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string()[..8].to_owned());
        Some(SlideElement::new(id, raw.kind, lines.join("\n")))
    }
}

impl SlideExtractor for JsonSlideExtractor {
    fn extract(&self, source: &[u8]) -> Result<Vec<Slide>> {
        let deck: RawDeck = serde_json::from_slice(source).map_err(|e| {
            Error::extraction()
                .with_message(format!("could not read slide deck: {e}"))
                .with_source(e)
        })?;

        let raw_slides = match deck {
            RawDeck::Slides(slides) | RawDeck::Wrapped { slides } => slides,
        };
        let total = raw_slides.len();

        let slides: Vec<Slide> = raw_slides
            .into_iter()
            .filter_map(|raw| {
                let elements: Vec<_> = raw
                    .elements
                    .into_iter()
                    .filter_map(Self::filter_element)
                    .collect();
                (!elements.is_empty()).then(|| Slide::new(raw.slide_number, elements))
            })
            .collect();

        tracing::debug!(
            target: TRACING_TARGET_EXTRACT,
            slides = total,
            reviewable = slides.len(),
            "Extracted slides from deck"
        );

        Ok(slides)
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const DECK: &str = r#"[
        {"slide_number": 2, "elements": [
            {"id": "t1", "type": "Title/Subtitle", "text": "Q3 procurement savings roadmap and next steps"},
            {"id": "b1", "type": "Body", "text": "18%\u000bWe will leverage synergies in order to reduce cost\nwww.example.com has the details for all of this"},
            {"type": "Table", "text": "Cost bucket\nLever: re-tender resin supply to tap local competition"}
        ]},
        {"slide_number": 3, "elements": [{"id": "b2", "type": "Body", "text": "42"}]}
    ]"#;

    #[test]
    fn filters_lines_and_drops_empty_slides() {
        let slides = JsonSlideExtractor.extract(DECK.as_bytes()).unwrap();

        assert_eq!(slides.len(), 1);
        let slide = &slides[0];
        assert_eq!(slide.slide_number, 2);
        assert_eq!(slide.elements.len(), 3);
        assert_eq!(slide.elements[0].kind, ElementKind::Title);
        assert_eq!(
            slide.elements[1].text,
            "We will leverage synergies in order to reduce cost"
        );
        assert_eq!(
            slide.elements[2].text,
            "Row ?, Col ?: re-tender resin supply to tap local competition"
        );
        assert_eq!(slide.elements[2].id.len(), 8);
    }

    #[test]
    fn accepts_wrapped_decks() {
        let deck = r#"{"slides": [{"slide_number": 1, "elements": [
            {"id": "a", "type": "Body", "text": "This sentence has more than five words"}
        ]}]}"#;
        let slides = JsonSlideExtractor.extract(deck.as_bytes()).unwrap();
        assert_eq!(slides.len(), 1);
    }

    #[test]
    fn errors_on_unreadable_decks() {
        let err = JsonSlideExtractor.extract(b"not json").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Extraction);
        assert!(err.user_message().starts_with("could not read slide deck"));
    }

    #[test]
    fn decks_without_reviewable_text_are_empty() {
        let slides = JsonSlideExtractor
            .extract(br#"[{"slide_number": 1, "elements": [{"type": "Body", "text": "42"}]}]"#)
            .unwrap();
        assert!(slides.is_empty());
    }
}
