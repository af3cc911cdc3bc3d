//! Process-wide logging setup for vault binaries.

/// Subscriber configuration (filters, output format).
pub mod subscriber;

pub use subscriber::{init, LogFormat, DEFAULT_FILTER};
