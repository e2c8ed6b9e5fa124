//! Metric names for skillet, plus the `metrics` facade macros.
//!
//! Nothing is exported until the embedding binary installs a recorder; until
//! then every macro call is a no-op.
//!
//! ```rust,ignore
//! use skillet_metrics::{counter, skills};
//!
//! counter!(skills::INSTALLATION_ATTEMPTS_TOTAL).increment(1);
//! ```

mod definitions;

pub use definitions::*;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
