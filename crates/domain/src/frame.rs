//! Wire framing for canonical events.
//!
//! A frame is `data: ` + compact JSON of one [`CanonicalEvent`] + a blank
//! line. [`FrameDecoder`] is the consumer half: feed it bytes as they
//! arrive and it yields every complete frame's payload.

use crate::error::Result;
use crate::event::CanonicalEvent;

/// Frame terminator.
pub const FRAME_TERMINATOR: &str = "\n\n";

const DATA_PREFIX: &str = "data:";

/// Encode one event as a complete wire frame.
pub fn encode_frame(event: &CanonicalEvent) -> Result<String> {
    let json = serde_json::to_string(event)?;
    Ok(format!("data: {json}{FRAME_TERMINATOR}"))
}

/// Decode one frame payload (the text after `data:`) into an event.
pub fn decode_payload(payload: &str) -> Result<CanonicalEvent> {
    Ok(serde_json::from_str(payload.trim())?)
}

/// Incremental splitter: accumulates text, splits on the frame
/// terminator, and extracts each frame's `data:` payload.
///
/// Bytes are buffered until they form valid UTF-8, so multi-byte
/// characters split across network chunks decode correctly. Invalid
/// sequences become U+FFFD without disturbing an incomplete tail.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    buffer: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return the payloads of all frames now complete.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut consumed = 0;
        loop {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    self.buffer.push_str(s);
                    consumed = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.buffer.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match e.error_len() {
                        // Invalid sequence: replace it and keep scanning.
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            consumed += valid + len;
                        }
                        // Incomplete tail: wait for more bytes.
                        None => {
                            consumed += valid;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);
        self.drain()
    }

    /// Feed text and return the payloads of all frames now complete.
    pub fn push_str(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);
        self.drain()
    }

    /// Whether a partial frame is still buffered.
    pub fn has_partial(&self) -> bool {
        !self.buffer.trim().is_empty() || !self.pending.is_empty()
    }

    fn drain(&mut self) -> Vec<String> {
        // Normalize CRLF so servers that terminate with "\r\n\r\n" still split.
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find(FRAME_TERMINATOR) {
            let frame: String = self.buffer.drain(..pos + FRAME_TERMINATOR.len()).collect();
            let data: Vec<&str> = frame
                .lines()
                .filter_map(|line| line.strip_prefix(DATA_PREFIX))
                .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
                .collect();
            if !data.is_empty() {
                payloads.push(data.join("\n"));
            }
        }
        payloads
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
