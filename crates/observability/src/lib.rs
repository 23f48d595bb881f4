//! Tracing and logging setup shared by the mill binaries.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::{LogFormat, init, init_with};
