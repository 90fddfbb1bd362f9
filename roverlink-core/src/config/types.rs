//! Configuration type definitions
//!
//! Configuration is fixed at startup. The firmware embeds it as TOML text
//! and parses it with [`super::parse_config`].

use roverlink_protocol::{CommandToken, RoverId};

use super::hardware::{BoardVariant, RadioPins};
use crate::session::SessionTiming;
use crate::traits::RadioConfig;

/// Current configuration format version
pub const CONFIG_VERSION: u8 = 1;

/// Lowest carrier frequency the RFM9x family tunes to
pub const MIN_FREQUENCY_HZ: u32 = 137_000_000;

/// Highest carrier frequency the RFM9x family tunes to
pub const MAX_FREQUENCY_HZ: u32 = 1_020_000_000;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Config version not understood by this build
    VersionMismatch,
    /// Carrier frequency outside 137–1020 MHz
    FrequencyOutOfRange,
    /// Transmit power outside the selected amplifier's range
    PowerOutOfRange,
    /// Reply window of zero
    ZeroReplyTimeout,
    /// Two radio pins share a GPIO
    PinConflict,
}

/// Radio link settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Rover addressed by every frame
    pub rover_id: RoverId,
    /// Carrier frequency in Hz
    pub frequency_hz: u32,
    /// Transmit power in dBm
    pub tx_power_dbm: i8,
    /// Transmit on PA_BOOST (true) or RFO (false)
    pub pa_boost: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            rover_id: RoverId::default(),
            frequency_hz: 915_000_000,
            tx_power_dbm: 5,
            pa_boost: true,
        }
    }
}

impl LinkConfig {
    pub fn radio_config(&self) -> RadioConfig {
        RadioConfig {
            frequency_hz: self.frequency_hz,
            tx_power_dbm: self.tx_power_dbm,
            pa_boost: self.pa_boost,
        }
    }
}

/// Loop and session timing, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingConfig {
    /// Pause after each accepted send
    pub settle_ms: u32,
    /// Reply wait window per command
    pub reply_timeout_ms: u32,
    /// Pause at the end of every tick
    pub tick_delay_ms: u32,
    /// Radio reset pulse width
    pub reset_pulse_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 10,
            reply_timeout_ms: 100,
            tick_delay_ms: 10,
            reset_pulse_ms: 10,
        }
    }
}

impl TimingConfig {
    pub fn session(&self) -> SessionTiming {
        SessionTiming {
            settle_ms: self.settle_ms,
            reply_timeout_ms: self.reply_timeout_ms,
        }
    }
}

/// Where commands come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputMode {
    /// Button pad, one command per active control
    #[default]
    Buttons,
    /// Link test: every well-known command, every tick
    Cycle,
    /// Link test: the ping command, every tick
    Ping,
}

/// What a held control does on later ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HoldPolicy {
    /// Send again on every tick while held
    #[default]
    Repeat,
    /// Send once when pressed
    Edge,
}

/// Complete controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerConfig {
    /// Configuration version for compatibility checks
    pub version: u8,
    pub link: LinkConfig,
    pub timing: TimingConfig,
    pub mode: InputMode,
    pub hold: HoldPolicy,
    /// Command sent each tick in [`InputMode::Ping`]
    pub ping_command: CommandToken,
    pub board: BoardVariant,
    pub pins: RadioPins,
    /// Ticks between link statistics log lines; 0 disables them
    pub stats_interval_ticks: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let board = BoardVariant::default();
        Self {
            version: CONFIG_VERSION,
            link: LinkConfig::default(),
            timing: TimingConfig::default(),
            mode: InputMode::default(),
            hold: HoldPolicy::default(),
            ping_command: CommandToken::default(),
            board,
            pins: board.radio_pins(),
            stats_interval_ticks: 500,
        }
    }
}

impl ControllerConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the configuration before the radio is touched
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch);
        }
        let freq = self.link.frequency_hz;
        if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&freq) {
            return Err(ConfigError::FrequencyOutOfRange);
        }

        let power_range = if self.link.pa_boost { 2..=20 } else { -1..=14 };
        if !power_range.contains(&self.link.tx_power_dbm) {
            return Err(ConfigError::PowerOutOfRange);
        }

        if self.timing.reply_timeout_ms == 0 {
            return Err(ConfigError::ZeroReplyTimeout);
        }

        if self.pins.has_conflict() {
            return Err(ConfigError::PinConflict);
        }

        Ok(())
    }
}
