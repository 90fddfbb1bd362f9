//! Events that trigger state transitions

use super::machine::FatalKind;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Radio configured and input source up
    BootComplete,
    /// Unrecoverable failure
    Fatal(FatalKind),
}

impl Event {
    /// Check if this event indicates a failure
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::Fatal(_))
    }
}
