//! Server-sent events decoding for chat completion streams.

use serde::Deserialize;

use crate::{Error, Result};

/// Terminator sent as the last `data:` payload.
const DONE: &str = "[DONE]";

/// Incremental decoder turning body bytes into `data:` payloads.
///
/// Bytes may split lines, events and UTF-8 sequences at any point.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
    done: bool,
}

/// One decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SseEvent {
    Data(String),
    Done,
}

impl SseDecoder {
    /// Feeds body bytes and returns every event they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                self.dispatch(&mut events);
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            if let Some(value) = line.strip_prefix("data:") {
                let value = value.strip_prefix(' ').unwrap_or(value);
                self.data.push(value.to_owned());
            }
        }

        events
    }

    /// Flushes an event left unterminated at end of body.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if !self.pending.is_empty() {
            self.pending.push(b'\n');
            events = self.push(&[]);
        }
        self.dispatch(&mut events);
        events
    }

    fn dispatch(&mut self, events: &mut Vec<SseEvent>) {
        if self.data.is_empty() || self.done {
            self.data.clear();
            return;
        }

        let data = std::mem::take(&mut self.data).join("\n");
        if data.trim() == DONE {
            self.done = true;
            events.push(SseEvent::Done);
        } else {
            events.push(SseEvent::Data(data));
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChoicePayload>,
    #[serde(default)]
    error: Option<ErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct ChoicePayload {
    #[serde(default)]
    delta: Option<DeltaPayload>,
}

#[derive(Debug, Deserialize)]
struct DeltaPayload {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(default)]
    pub message: String,
}

/// Error body of a non-success API response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: ErrorPayload,
}

/// Extracts the text delta of one `chat.completion.chunk` payload.
///
/// Chunks without content (role announcements, finish markers) yield `None`.
pub(crate) fn delta_content(data: &str) -> Result<Option<String>> {
    let payload: ChunkPayload = serde_json::from_str(data)?;

    if let Some(error) = payload.error {
        return Err(Error::Stream(error.message));
    }

    Ok(payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_split_across_pushes() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        assert!(decoder.push(b":1}\n").is_empty());
        assert_eq!(
            decoder.push(b"\n"),
            vec![SseEvent::Data("{\"a\":1}".into())]
        );
    }

    #[test]
    fn test_crlf_comments_and_done() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keep-alive\r\n\r\ndata: x\r\n\r\ndata: [DONE]\r\n\r\ndata: y\n\n");
        assert_eq!(events, vec![SseEvent::Data("x".into()), SseEvent::Done]);
    }

    #[test]
    fn test_multi_line_data_and_finish() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: a\ndata: b\n").is_empty());
        assert_eq!(decoder.finish(), vec![SseEvent::Data("a\nb".into())]);

        let mut decoder = SseDecoder::default();
        decoder.push(b"data: tail");
        assert_eq!(decoder.finish(), vec![SseEvent::Data("tail".into())]);
    }

    #[test]
    fn test_utf8_split_inside_character() {
        let mut decoder = SseDecoder::default();
        let bytes = "data: Überblick\n\n".as_bytes();
        assert!(decoder.push(&bytes[..7]).is_empty());
        assert_eq!(
            decoder.push(&bytes[7..]),
            vec![SseEvent::Data("Überblick".into())]
        );
    }

    #[test]
    fn test_delta_content() {
        let data = r#"{"choices":[{"index":0,"delta":{"content":"| Page |"}}]}"#;
        assert_eq!(delta_content(data).unwrap().as_deref(), Some("| Page |"));

        let role = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(delta_content(role).unwrap(), None);

        let finish = r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(delta_content(finish).unwrap(), None);

        let error = r#"{"error":{"message":"overloaded"}}"#;
        assert!(matches!(delta_content(error), Err(Error::Stream(m)) if m == "overloaded"));

        assert!(delta_content("not json").is_err());
    }
}
