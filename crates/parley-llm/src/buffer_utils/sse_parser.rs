use super::buffering::CircularLineBuffer;
use crate::streaming::ChatStreamChunk;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// One decoded `data:` line of a chat completion stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Non-empty `choices[0].delta.content`
    Delta(String),

    /// The `[DONE]` sentinel
    Done,

    /// A data line that could not be decoded; callers log and skip it
    Malformed { data: String, reason: String },
}

/// Incremental decoder for `data: <json|[DONE]>` server-sent-event lines
///
/// Feed it raw chunks in arrival order. Complete lines are decoded right away;
/// the trailing incomplete line is retained until the next chunk completes it.
pub struct SseDecoder {
    buffer: CircularLineBuffer,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self {
            buffer: CircularLineBuffer::with_capacity(8192),
        }
    }

    /// Add a chunk and decode every line it completes
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend(bytes);

        let mut events = Vec::new();
        while let Some(line_result) = self.buffer.next_line() {
            match line_result {
                Ok(line) => {
                    if let Some(event) = decode_line(&line) {
                        events.push(event);
                    }
                }
                Err(e) => events.push(SseEvent::Malformed {
                    data: String::new(),
                    reason: format!("Invalid UTF-8: {}", e),
                }),
            }
        }
        events
    }

    /// Bytes held back waiting for a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a single trimmed line. Lines that are not `data:` lines, and chunks
/// without content (role announcements, finish markers), yield nothing.
fn decode_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix(DATA_PREFIX)?.trim();

    if data == DONE_MARKER {
        return Some(SseEvent::Done);
    }

    match serde_json::from_str::<ChatStreamChunk>(data) {
        Ok(chunk) => chunk
            .content()
            .filter(|content| !content.is_empty())
            .map(|content| SseEvent::Delta(content.to_string())),
        Err(e) => Some(SseEvent::Malformed {
            data: data.to_string(),
            reason: e.to_string(),
        }),
    }
}
