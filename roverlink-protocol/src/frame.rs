//! Outbound command frame encoding.
//!
//! Frame format:
//! - ROVER ID (1+ bytes): text, no `,` and no NUL
//! - SEPARATOR (1 byte): `,`
//! - COMMAND (1+ bytes): text, no `,` and no NUL
//! - TERMINATOR (1 byte): 0x00
//!
//! The radio transport carries the frame as an opaque payload.

use heapless::Vec;

/// Field separator between rover id and command
pub const SEPARATOR: u8 = b',';

/// Frame terminator
pub const TERMINATOR: u8 = 0x00;

/// Largest frame the codec will build.
///
/// Matches the largest user message an RFM95 carries once the 4-byte
/// RadioHead header is accounted for.
pub const MAX_FRAME_SIZE: usize = 251;

/// Errors that can occur while encoding a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// A field contains the `,` separator
    ReservedSeparator,
    /// A field contains a NUL byte
    EmbeddedNul,
    /// A field is empty
    EmptyField,
    /// Encoded frame exceeds the transport payload limit
    PayloadTooLarge,
}

/// Encoded frame, ready to hand to a radio transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    bytes: Vec<u8, MAX_FRAME_SIZE>,
    split: usize,
}

impl OutboundFrame {
    /// Raw frame bytes including the NUL terminator
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame length in bytes, terminator included
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// A frame always holds at least `",\0"` plus two non-empty fields
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Rover id part of the frame
    pub fn rover_id(&self) -> &str {
        // Fields were copied from `&str`s and split on ASCII bytes
        core::str::from_utf8(&self.bytes[..self.split]).unwrap_or("")
    }

    /// Command part of the frame
    pub fn command(&self) -> &str {
        let end = self.bytes.len() - 1;
        core::str::from_utf8(&self.bytes[self.split + 1..end]).unwrap_or("")
    }

    /// Frame text without the terminator, for logging
    pub fn text(&self) -> &str {
        let end = self.bytes.len() - 1;
        core::str::from_utf8(&self.bytes[..end]).unwrap_or("")
    }
}

fn check_field(field: &str) -> Result<(), FrameError> {
    if field.is_empty() {
        return Err(FrameError::EmptyField);
    }
    let bytes = field.as_bytes();
    if bytes.contains(&SEPARATOR) {
        return Err(FrameError::ReservedSeparator);
    }
    if bytes.contains(&TERMINATOR) {
        return Err(FrameError::EmbeddedNul);
    }
    Ok(())
}

/// Build the frame `rover_id "," command NUL`.
///
/// `max_payload` is the transport's payload limit; the codec never builds
/// more than [`MAX_FRAME_SIZE`] bytes regardless.
pub fn encode(rover_id: &str, command: &str, max_payload: usize) -> Result<OutboundFrame, FrameError> {
    check_field(rover_id)?;
    check_field(command)?;

    let frame_len = rover_id.len() + 1 + command.len() + 1;
    if frame_len > max_payload.min(MAX_FRAME_SIZE) {
        return Err(FrameError::PayloadTooLarge);
    }

    let mut bytes = Vec::new();
    bytes
        .extend_from_slice(rover_id.as_bytes())
        .map_err(|_| FrameError::PayloadTooLarge)?;
    bytes.push(SEPARATOR).map_err(|_| FrameError::PayloadTooLarge)?;
    bytes
        .extend_from_slice(command.as_bytes())
        .map_err(|_| FrameError::PayloadTooLarge)?;
    bytes.push(TERMINATOR).map_err(|_| FrameError::PayloadTooLarge)?;

    Ok(OutboundFrame {
        bytes,
        split: rover_id.len(),
    })
}
