//! Process state machine
//!
//! The controller is either booting, running its tick loop, or halted after
//! a fatal startup failure. Halted is terminal.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::{FatalKind, State};
