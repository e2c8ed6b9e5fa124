//! Shared building blocks for the skillet crates.

pub mod error;

pub use error::{BoxError, FromMessage};
