//! Process-wide logging setup for binaries embedding the permit engine.

/// Tracing subscriber configuration.
pub mod tracing;

pub use crate::tracing::{LogFormat, ObservabilityConfig};

/// Initialize process-wide observability with JSON logs filtered by `RUST_LOG`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init_with(&ObservabilityConfig::default());
}

/// Initialize with explicit settings. Same no-op semantics as [`init`].
pub fn init_with(config: &ObservabilityConfig) {
    tracing::init_with(config);
}
