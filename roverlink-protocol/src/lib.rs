//! Roverlink command protocol
//!
//! This crate defines the payload carried over the LoRa link between the
//! handheld controller and a rover. The payload is deliberately tiny: one
//! text frame per command, no sequence numbers, no checksum (the radio adds
//! its own CRC).
//!
//! # Frame format
//!
//! ```text
//! ┌──────────┬─────┬─────────┬──────┐
//! │ ROVER ID │ ',' │ COMMAND │ NUL  │
//! │ 1–n B    │ 1B  │ 1–n B   │ 1B   │
//! └──────────┴─────┴─────────┴──────┘
//! ```
//!
//! Replies from the rover are opaque. They are decoded best-effort into
//! display text and never fail to decode.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod commands;
pub mod controls;
pub mod frame;
pub mod reply;

pub use commands::{CommandToken, RoverId, MAX_TOKEN_LEN};
pub use controls::{Control, ControlSet};
pub use frame::{encode, FrameError, OutboundFrame, MAX_FRAME_SIZE, SEPARATOR, TERMINATOR};
pub use reply::{decode, InboundReply};
