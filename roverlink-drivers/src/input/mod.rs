//! Button pad inputs

pub mod seesaw;

pub use seesaw::SeesawButtons;
