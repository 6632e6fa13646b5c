//! Process-wide tracing setup.

pub mod tracing;

pub use self::tracing::LogFormat;

/// Install the global subscriber with `format`; `RUST_LOG` overrides the
/// default `info` filter.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(format: LogFormat) {
    tracing::init(format, "info");
}
