//! Best-effort decoding of rover replies.
//!
//! The rover's reply carries no schema. Decoding never fails: the payload is
//! kept verbatim and a display string is derived from it.

use heapless::{String, Vec};

use crate::frame::{MAX_FRAME_SIZE, SEPARATOR, TERMINATOR};

/// Worst case text size: every byte replaced by U+FFFD (3 bytes in UTF-8)
const MAX_TEXT_SIZE: usize = MAX_FRAME_SIZE * 3;

/// Reply received from a rover within the wait window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundReply {
    payload: Vec<u8, MAX_FRAME_SIZE>,
    text: String<MAX_TEXT_SIZE>,
    rssi: Option<i16>,
}

impl InboundReply {
    /// Exact bytes handed over by the transport (truncated to [`MAX_FRAME_SIZE`])
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Printable rendering of the payload
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Signal strength of the reply in dBm, if the transport reported it
    pub fn rssi(&self) -> Option<i16> {
        self.rssi
    }

    /// Attach the signal strength reported by the transport
    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Comma-separated fields of the text
    pub fn fields(&self) -> core::str::Split<'_, char> {
        self.text.split(SEPARATOR as char)
    }
}

/// Decode raw reply bytes.
///
/// Text stops at the first NUL, if any. Invalid UTF-8 sequences are
/// replaced with U+FFFD.
pub fn decode(raw: &[u8]) -> InboundReply {
    let raw = &raw[..raw.len().min(MAX_FRAME_SIZE)];

    let mut payload = Vec::new();
    // Cannot overflow: `raw` was clamped to capacity above
    let _ = payload.extend_from_slice(raw);

    let visible = match raw.iter().position(|&b| b == TERMINATOR) {
        Some(end) => &raw[..end],
        None => raw,
    };

    let mut text = String::new();
    for chunk in visible.utf8_chunks() {
        let _ = text.push_str(chunk.valid());
        if !chunk.invalid().is_empty() {
            let _ = text.push(char::REPLACEMENT_CHARACTER);
        }
    }

    InboundReply {
        payload,
        text,
        rssi: None,
    }
}
