//! Rover identifiers and command tokens

use heapless::String;

use crate::frame::{FrameError, SEPARATOR, TERMINATOR};

/// Longest rover id or command token accepted
pub const MAX_TOKEN_LEN: usize = 32;

/// Drive forward
pub const FORWARD: &str = "forward";
/// Drive backward
pub const BACKWARD: &str = "backward";
/// Turn left
pub const LEFT: &str = "left";
/// Turn right
pub const RIGHT: &str = "right";
/// Sound the horn once
pub const BEEP: &str = "beep";
/// Sound the horn twice
pub const BEEP_TWICE: &str = "beepTwice";
/// Link test message
pub const TEST: &str = "test";
/// Stop all motion
pub const STOP: &str = "stop";
/// Resume after a stop
pub const START: &str = "start";

fn validate(token: &str) -> Result<String<MAX_TOKEN_LEN>, FrameError> {
    if token.is_empty() {
        return Err(FrameError::EmptyField);
    }
    if token.bytes().any(|b| b == SEPARATOR) {
        return Err(FrameError::ReservedSeparator);
    }
    if token.bytes().any(|b| b == TERMINATOR) {
        return Err(FrameError::EmbeddedNul);
    }
    let mut out = String::new();
    out.push_str(token).map_err(|_| FrameError::PayloadTooLarge)?;
    Ok(out)
}

/// Identifier of the addressed rover, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoverId(String<MAX_TOKEN_LEN>);

impl RoverId {
    /// Validate and store a rover id
    pub fn new(id: &str) -> Result<Self, FrameError> {
        validate(id).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Rover `1`, the id stock rovers listen on
impl Default for RoverId {
    fn default() -> Self {
        let mut id = String::new();
        let _ = id.push('1');
        Self(id)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RoverId {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}

/// A command token, sent once and forgotten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandToken(String<MAX_TOKEN_LEN>);

impl CommandToken {
    /// Validate and store a command token
    pub fn new(token: &str) -> Result<Self, FrameError> {
        validate(token).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The link test message, [`TEST`]
impl Default for CommandToken {
    fn default() -> Self {
        let mut token = String::new();
        let _ = token.push_str(TEST);
        Self(token)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CommandToken {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_tokens_are_valid() {
        for token in [FORWARD, BACKWARD, LEFT, RIGHT, BEEP, BEEP_TWICE, TEST, STOP, START] {
            assert_eq!(CommandToken::new(token).unwrap().as_str(), token);
        }
    }

    #[test]
    fn test_rover_id() {
        assert_eq!(RoverId::new("1").unwrap().as_str(), "1");
        assert_eq!(RoverId::new(""), Err(FrameError::EmptyField));
        assert_eq!(RoverId::new("a,b"), Err(FrameError::ReservedSeparator));
        assert_eq!(RoverId::new("a\0"), Err(FrameError::EmbeddedNul));
    }

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(RoverId::default(), RoverId::new("1").unwrap());
        assert_eq!(CommandToken::default(), CommandToken::new(TEST).unwrap());
    }

    #[test]
    fn test_token_length_limit() {
        let max = "x".repeat(MAX_TOKEN_LEN);
        assert!(CommandToken::new(&max).is_ok());

        let over = "x".repeat(MAX_TOKEN_LEN + 1);
        assert_eq!(CommandToken::new(&over), Err(FrameError::PayloadTooLarge));
    }
}
