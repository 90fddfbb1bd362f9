//! State machine definition

use super::events::Event;
use crate::config::ConfigError;
use crate::traits::{InputError, RadioError};

/// Controller process states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Power-on: configuration check, radio and input bring-up
    Boot,
    /// Tick loop active
    Running,
    /// Startup failed; nothing is transmitted again
    Halted(FatalKind),
}

/// Reasons the controller can halt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FatalKind {
    /// Configuration failed validation
    Config(ConfigError),
    /// A configured GPIO could not be claimed
    Pins,
    /// Radio did not answer on the bus
    RadioNotFound,
    /// Radio answered but did not accept its configuration
    RadioInit,
    /// Radio rejected the carrier frequency
    FrequencyRejected,
    /// Radio rejected the transmit power
    PowerRejected,
    /// Bus fault talking to the radio
    RadioBus,
    /// Button pad did not answer
    InputNotFound,
    /// Bus fault talking to the button pad
    InputBus,
}

impl From<RadioError> for FatalKind {
    fn from(e: RadioError) -> Self {
        match e {
            RadioError::NotFound => FatalKind::RadioNotFound,
            RadioError::FrequencyRejected => FatalKind::FrequencyRejected,
            RadioError::PowerRejected => FatalKind::PowerRejected,
            RadioError::Bus => FatalKind::RadioBus,
            RadioError::InitFailed | RadioError::Busy | RadioError::PayloadTooLarge => {
                FatalKind::RadioInit
            }
        }
    }
}

impl From<InputError> for FatalKind {
    fn from(e: InputError) -> Self {
        match e {
            InputError::NotFound => FatalKind::InputNotFound,
            InputError::Bus => FatalKind::InputBus,
        }
    }
}

impl From<ConfigError> for FatalKind {
    fn from(e: ConfigError) -> Self {
        FatalKind::Config(e)
    }
}

impl State {
    /// Check if ticks may run
    pub fn is_running(&self) -> bool {
        matches!(self, State::Running)
    }

    /// Check if this is the halted state
    pub fn is_halted(&self) -> bool {
        matches!(self, State::Halted(_))
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use State::*;

        match (self, event) {
            (Boot, BootComplete) => Running,
            (Boot, Fatal(kind)) => Halted(kind),
            (Running, Fatal(kind)) => Halted(kind),

            // Halted is terminal
            _ => self,
        }
    }
}
