//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in roverlink-core:
//!
//! - Radio transport (RFM95/SX1276 LoRa module, RadioHead-compatible framing)
//! - Button pad (Adafruit mini TFT FeatherWing via its seesaw co-processor)
//!
//! Drivers are written against the roverlink-hal traits and
//! `embedded_hal::delay::DelayNs`, so they run unchanged on any chip HAL
//! and are tested on the host against register-level mocks.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

mod fmt;

pub mod input;
pub mod radio;
