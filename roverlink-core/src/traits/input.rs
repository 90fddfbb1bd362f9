//! Button pad input trait

use roverlink_protocol::ControlSet;

/// Errors reported by an input source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputError {
    /// Device absent or reported the wrong id
    NotFound,
    /// I2C fault
    Bus,
}

/// Source of per-tick control snapshots
pub trait InputSource {
    /// Bring the device up. Called once at boot.
    fn begin(&mut self) -> Result<(), InputError>;

    /// Controls currently held down
    fn read(&mut self) -> Result<ControlSet, InputError>;
}
