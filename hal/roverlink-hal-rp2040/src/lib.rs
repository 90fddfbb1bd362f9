//! RP2040 implementations of the Roverlink HAL traits
//!
//! - GPIO adapters over `embassy_rp::gpio`
//! - Blocking SPI and I²C bus wrappers
//! - Pin bank for taking GPIOs by number from the config

#![no_std]

pub mod bus;
pub mod gpio;
pub mod pins;

pub use bus::{RpI2c, RpSpi};
pub use gpio::{RpInput, RpOutput};
pub use pins::{BoardPeripherals, PinBank, PinError};
