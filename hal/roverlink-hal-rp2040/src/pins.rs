//! Config-driven pin allocation
//!
//! The bus pins are fixed by the board; everything else (radio CS, DIO0,
//! reset and the LED) is taken by number from the controller config.

use embassy_rp::gpio::AnyPin;
use embassy_rp::{Peri, Peripherals};
use roverlink_hal::i2c::I2cConfig;
use roverlink_hal::spi::SpiConfig;

use crate::bus::{RpI2c, RpSpi};
use crate::gpio::{RpInput, RpOutput};

/// Number of user GPIOs on the RP2040
pub const GPIO_COUNT: u8 = 30;

/// Pins claimed by SPI1 and I2C1
pub const BUS_PINS: [u8; 5] = [2, 3, 8, 14, 15];

/// Error when requesting a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range (0-29 valid)
    InvalidPin,
    /// Pin already taken
    AlreadyTaken,
    /// Pin belongs to a bus
    Reserved,
}

/// GPIOs not claimed by a bus, taken by number
pub struct PinBank {
    pins: [Option<Peri<'static, AnyPin>>; GPIO_COUNT as usize],
}

impl PinBank {
    /// Take a pin by number
    pub fn take(&mut self, pin_num: u8) -> Result<Peri<'static, AnyPin>, PinError> {
        if pin_num >= GPIO_COUNT {
            return Err(PinError::InvalidPin);
        }
        if BUS_PINS.contains(&pin_num) {
            return Err(PinError::Reserved);
        }
        self.pins[pin_num as usize]
            .take()
            .ok_or(PinError::AlreadyTaken)
    }

    /// Check if a pin is available
    pub fn is_available(&self, pin_num: u8) -> bool {
        pin_num < GPIO_COUNT && self.pins[pin_num as usize].is_some()
    }

    /// Take a pin as an output
    pub fn output(&mut self, pin_num: u8, initial_high: bool) -> Result<RpOutput, PinError> {
        self.take(pin_num).map(|pin| RpOutput::new(pin, initial_high))
    }

    /// Take a pin as an input
    pub fn input(&mut self, pin_num: u8, pull_up: bool) -> Result<RpInput, PinError> {
        self.take(pin_num).map(|pin| RpInput::new(pin, pull_up))
    }
}

/// Everything the firmware needs from the chip
pub struct BoardPeripherals {
    /// SPI1 to the radio
    pub spi: RpSpi,
    /// I2C1 to the button wing
    pub i2c: RpI2c,
    pub pins: PinBank,
}

impl BoardPeripherals {
    /// Split the chip peripherals into the two buses and a pin bank
    pub fn new(p: Peripherals, spi: SpiConfig, i2c: I2cConfig) -> Self {
        let spi = RpSpi::new(p.SPI1, p.PIN_14, p.PIN_15, p.PIN_8, spi);
        let i2c = RpI2c::new(p.I2C1, p.PIN_3, p.PIN_2, i2c);
        let pins = PinBank {
            pins: [
                Some(p.PIN_0.into()),
                Some(p.PIN_1.into()),
                None, // I2C1 SDA
                None, // I2C1 SCL
                Some(p.PIN_4.into()),
                Some(p.PIN_5.into()),
                Some(p.PIN_6.into()),
                Some(p.PIN_7.into()),
                None, // SPI1 MISO
                Some(p.PIN_9.into()),
                Some(p.PIN_10.into()),
                Some(p.PIN_11.into()),
                Some(p.PIN_12.into()),
                Some(p.PIN_13.into()),
                None, // SPI1 SCK
                None, // SPI1 MOSI
                Some(p.PIN_16.into()),
                Some(p.PIN_17.into()),
                Some(p.PIN_18.into()),
                Some(p.PIN_19.into()),
                Some(p.PIN_20.into()),
                Some(p.PIN_21.into()),
                Some(p.PIN_22.into()),
                Some(p.PIN_23.into()),
                Some(p.PIN_24.into()),
                Some(p.PIN_25.into()),
                Some(p.PIN_26.into()),
                Some(p.PIN_27.into()),
                Some(p.PIN_28.into()),
                Some(p.PIN_29.into()),
            ],
        };
        Self { spi, i2c, pins }
    }
}
