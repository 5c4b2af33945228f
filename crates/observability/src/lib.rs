//! Process-wide logging setup shared by the server and the import tool.

/// Initialize tracing with the format selected by `LARDER_LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Subscriber construction (filter, output format).
pub mod tracing;
