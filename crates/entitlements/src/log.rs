//! Outcome logger injected into the grant procedure.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Success,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl core::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget sink for grant outcomes (webhook audit log, tracing, ...).
///
/// Implementations must not fail the caller; a sink that cannot persist an
/// entry should drop it.
pub trait GrantLogger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

impl<F> GrantLogger for F
where
    F: Fn(LogLevel, &str) + Send + Sync,
{
    fn log(&self, level: LogLevel, message: &str) {
        self(level, message)
    }
}

/// Forwards grant outcomes to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingGrantLogger;

impl GrantLogger for TracingGrantLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Success => tracing::info!(outcome = %level, "{message}"),
            LogLevel::Error => tracing::error!(outcome = %level, "{message}"),
        }
    }
}
