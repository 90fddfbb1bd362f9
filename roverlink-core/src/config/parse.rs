//! Minimal TOML parser for controller configuration
//!
//! Handles only the subset the controller config uses. It does NOT support
//! all of TOML.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - [section] headers
//! - Comments (# ...), including trailing comments
//!
//! NOT supported:
//! - Arrays, inline tables and dotted keys
//! - Multi-line strings and escape sequences
//!
//! No allocation: the parser borrows from the input and writes straight into
//! a [`ControllerConfig`].

use heapless::String;
use roverlink_protocol::{CommandToken, FrameError, RoverId};

use super::hardware::{BoardVariant, PinConfig};
use super::types::{ControllerConfig, HoldPolicy, InputMode};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParseError {
    /// 1-based line number
    pub line: u16,
    pub kind: ParseErrorKind,
}

/// What went wrong on the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseErrorKind {
    /// Unknown or malformed section header
    InvalidSection,
    /// Line is neither a header nor `key = value`
    InvalidLine,
    /// Key not recognised in this section
    UnknownKey,
    /// Value has the wrong type, is out of range, or cannot go in a frame
    InvalidValue,
    /// String longer than the field holds
    TooLong,
    /// Pin string not of the form `gpioNN`
    InvalidPin,
    /// Board name not recognised
    UnknownBoard,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Link,
    Timing,
    Input,
    Pins,
}

/// Parse TOML configuration text
///
/// Keys that are absent keep their defaults. A root-level `board` key loads
/// that board's pin table; a later `[pins]` section overrides single pins.
pub fn parse_config(input: &str) -> Result<ControllerConfig, ParseError> {
    let mut config = ControllerConfig::new();
    let mut section = Section::Root;

    for (index, line) in input.lines().enumerate() {
        let line_no = (index + 1).min(u16::MAX as usize) as u16;
        let at = |kind| ParseError {
            line: line_no,
            kind,
        };

        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') {
            if !line.ends_with(']') {
                return Err(at(ParseErrorKind::InvalidSection));
            }
            section = parse_section_header(&line[1..line.len() - 1]).map_err(at)?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(at(ParseErrorKind::InvalidLine))?;
        apply_value(section, key, value, &mut config).map_err(at)?;
    }

    Ok(config)
}

/// Parse section header like "link" or "timing"
fn parse_section_header(header: &str) -> Result<Section, ParseErrorKind> {
    match header.trim() {
        "link" => Ok(Section::Link),
        "timing" => Ok(Section::Timing),
        "input" => Ok(Section::Input),
        "pins" => Ok(Section::Pins),
        _ => Err(ParseErrorKind::InvalidSection),
    }
}

/// Drop a trailing `# comment` that is not inside a string
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> Result<&str, ParseErrorKind> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Ok(&value[1..value.len() - 1])
    } else {
        Err(ParseErrorKind::InvalidValue)
    }
}

fn parse_token<T>(
    value: &str,
    make: fn(&str) -> Result<T, FrameError>,
) -> Result<T, ParseErrorKind> {
    make(parse_string(value)?).map_err(|e| match e {
        FrameError::PayloadTooLarge => ParseErrorKind::TooLong,
        _ => ParseErrorKind::InvalidValue,
    })
}

/// Parse an integer value, allowing `_` digit separators
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseErrorKind> {
    let mut digits: String<24> = String::new();
    for c in value.chars().filter(|&c| c != '_') {
        digits.push(c).map_err(|_| ParseErrorKind::InvalidValue)?;
    }
    digits.parse().map_err(|_| ParseErrorKind::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseErrorKind> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseErrorKind::InvalidValue),
    }
}

/// Parse a pin string like "gpio16", "!gpio13", "^gpio21"
fn parse_pin(value: &str) -> Result<PinConfig, ParseErrorKind> {
    let mut rest = parse_string(value).map_err(|_| ParseErrorKind::InvalidPin)?;
    let mut pin = PinConfig::default();

    loop {
        if let Some(r) = rest.strip_prefix('!') {
            pin.inverted = true;
            rest = r;
        } else if let Some(r) = rest.strip_prefix('^') {
            pin.pull_up = true;
            rest = r;
        } else {
            break;
        }
    }

    let number = rest.strip_prefix("gpio").ok_or(ParseErrorKind::InvalidPin)?;
    pin.pin = number.parse().map_err(|_| ParseErrorKind::InvalidPin)?;
    Ok(pin)
}

fn parse_mode(value: &str) -> Result<InputMode, ParseErrorKind> {
    match parse_string(value)? {
        "buttons" => Ok(InputMode::Buttons),
        "cycle" => Ok(InputMode::Cycle),
        "ping" => Ok(InputMode::Ping),
        _ => Err(ParseErrorKind::InvalidValue),
    }
}

fn parse_hold(value: &str) -> Result<HoldPolicy, ParseErrorKind> {
    match parse_string(value)? {
        "repeat" => Ok(HoldPolicy::Repeat),
        "edge" => Ok(HoldPolicy::Edge),
        _ => Err(ParseErrorKind::InvalidValue),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut ControllerConfig,
) -> Result<(), ParseErrorKind> {
    match (section, key) {
        (Section::Root, "version") => config.version = parse_int(value)?,
        (Section::Root, "board") => {
            let board = BoardVariant::from_name(parse_string(value)?)
                .ok_or(ParseErrorKind::UnknownBoard)?;
            config.board = board;
            config.pins = board.radio_pins();
        }
        (Section::Root, "stats_interval_ticks") => config.stats_interval_ticks = parse_int(value)?,

        (Section::Link, "rover_id") => config.link.rover_id = parse_token(value, RoverId::new)?,
        (Section::Link, "frequency_hz") => config.link.frequency_hz = parse_int(value)?,
        (Section::Link, "tx_power_dbm") => config.link.tx_power_dbm = parse_int(value)?,
        (Section::Link, "pa_boost") => config.link.pa_boost = parse_bool(value)?,

        (Section::Timing, "settle_ms") => config.timing.settle_ms = parse_int(value)?,
        (Section::Timing, "reply_timeout_ms") => config.timing.reply_timeout_ms = parse_int(value)?,
        (Section::Timing, "tick_delay_ms") => config.timing.tick_delay_ms = parse_int(value)?,
        (Section::Timing, "reset_pulse_ms") => config.timing.reset_pulse_ms = parse_int(value)?,

        (Section::Input, "mode") => config.mode = parse_mode(value)?,
        (Section::Input, "hold") => config.hold = parse_hold(value)?,
        (Section::Input, "ping_command") => {
            config.ping_command = parse_token(value, CommandToken::new)?
        }

        (Section::Pins, "cs") => config.pins.cs = parse_pin(value)?,
        (Section::Pins, "irq") => config.pins.irq = parse_pin(value)?,
        (Section::Pins, "reset") => config.pins.reset = parse_pin(value)?,
        (Section::Pins, "led") => {
            config.pins.led = match parse_string(value)? {
                "none" => None,
                _ => Some(parse_pin(value)?),
            }
        }

        _ => return Err(ParseErrorKind::UnknownKey),
    }
    Ok(())
}
