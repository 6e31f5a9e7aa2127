//! Process-wide tracing/logging setup.

pub mod tracing;

/// Initialize logging for the process.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}
