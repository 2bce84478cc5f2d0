//! Process-wide tracing/logging setup.

/// Initialize JSON logging for the process.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::Json);
}

/// Initialize logging in the given output format.
pub fn init_with(format: LogFormat) {
    tracing::init(format);
}

/// Subscriber construction (filters, formatting).
pub mod tracing;

pub use tracing::{LogFormat, ParseLogFormatError};
