use std::collections::VecDeque;
use std::str::Utf8Error;

/// Circular buffer for line-based parsing of a chunked byte stream
///
/// Bytes are kept until a `\n` arrives, so a line (or a multi-byte UTF-8
/// sequence) split across two network reads is reassembled before decoding.
pub struct CircularLineBuffer {
    buffer: VecDeque<u8>,
}

impl CircularLineBuffer {
    /// Create a new buffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    /// Add bytes to the buffer
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Extract next line (up to \n) from buffer, trimmed
    /// Returns None if no complete line is available
    pub fn next_line(&mut self) -> Option<Result<String, Utf8Error>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;

        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();

        match std::str::from_utf8(&line_bytes) {
            Ok(line_str) => Some(Ok(line_str.trim().to_string())),
            Err(e) => Some(Err(e)),
        }
    }

    /// Bytes of the trailing incomplete line
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
