//! Radio transports

pub mod rfm95;

pub use rfm95::Rfm95;
