//! Board-agnostic core logic for the handheld rover controller
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (radio transport, button pad, feedback)
//! - Command session: send one frame, wait briefly for a reply
//! - Command sources (button pad keymap, link-test scripts)
//! - Control loop and process state machine
//! - Link statistics
//! - Configuration types and the config file parser

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

mod fmt;

pub mod config;
pub mod controller;
pub mod session;
pub mod source;
pub mod state;
pub mod stats;
pub mod traits;

pub use controller::{halt_unbuilt, Controller, TickReport};
pub use session::{SessionOutcome, SessionTiming};
