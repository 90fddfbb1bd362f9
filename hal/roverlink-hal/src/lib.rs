//! Roverlink Hardware Abstraction Layer
//!
//! Chip-agnostic traits for the peripherals the controller touches: a few
//! GPIO lines, the SPI bus to the LoRa radio and the I²C bus to the button
//! pad. Drivers in `roverlink-drivers` are written against these traits so
//! they can be exercised on the host with mocks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  roverlink-firmware                     │
//! └─────────────────────────────────────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌──────────────────┐   ┌──────────────────┐
//! │ roverlink-drivers│──▶│ roverlink-hal    │
//! │ (RFM95, seesaw)  │   │ (this crate)     │
//! └──────────────────┘   └──────────────────┘
//!                                 ▲
//!                                 │
//!                        ┌──────────────────┐
//!                        │ roverlink-hal-   │
//!                        │     rp2040       │
//!                        └──────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - Digital I/O
//! - [`spi::SpiBus`] - SPI master transfers
//! - [`i2c::I2cBus`] - I2C master transfers

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod i2c;
pub mod spi;

// Re-export key traits at crate root for convenience
pub use gpio::{InputPin, OutputPin};
pub use i2c::I2cBus;
pub use spi::SpiBus;
