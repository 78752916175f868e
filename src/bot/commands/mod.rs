//! Discord command implementations.

/// General utility commands
pub mod general;

pub use general::*;
