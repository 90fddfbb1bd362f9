//! SPI bus abstractions

/// SPI bus master
///
/// Chip select is not part of the bus; drivers own their CS pin and frame
/// transactions themselves.
pub trait SpiBus {
    /// Error type for SPI operations
    type Error;

    /// Write bytes, discarding whatever is clocked in
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Write the buffer while reading into it
    fn transfer_in_place(&mut self, data: &mut [u8]) -> Result<(), Self::Error>;
}

/// SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// Clock polarity and phase
    pub mode: Mode,
}

impl Default for SpiConfig {
    /// SX127x-family radios: mode 0, 1 MHz
    fn default() -> Self {
        Self {
            frequency: 1_000_000,
            mode: Mode::Mode0,
        }
    }
}

/// SPI mode (combined polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// CPOL=0, CPHA=0
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
}

impl Mode {
    /// Clock idles high
    pub fn idle_high(self) -> bool {
        matches!(self, Mode::Mode2 | Mode::Mode3)
    }

    /// Data captured on the second clock transition
    pub fn capture_on_second(self) -> bool {
        matches!(self, Mode::Mode1 | Mode::Mode3)
    }
}
