//! Configuration types
//!
//! Board-agnostic configuration structures and the TOML subset parser that
//! fills them.

pub mod hardware;
pub mod parse;
pub mod types;

pub use hardware::*;
pub use parse::{parse_config, ParseError, ParseErrorKind};
pub use types::*;
