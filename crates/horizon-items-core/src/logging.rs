//! Logging and debugging facilities for Horizon Items.
//!
//! This module provides:
//! - Target and span names for the `tracing` crate
//! - Performance tracing hooks for profiling
//!
//! # Tracing Integration
//!
//! Horizon Items uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_items::generator=trace")
//!         .init();
//! }
//! ```

/// Span names used throughout Horizon Items for tracing.
///
/// These constants can be used to filter traces for specific subsystems.
pub mod span_names {
    /// Full generator teardown span.
    pub const REMOVE_ALL: &str = "horizon_items::remove_all";
    /// Consistency verification span.
    pub const VERIFY: &str = "horizon_items::verify";
    /// Grouped view rebuild span.
    pub const REGROUP: &str = "horizon_items::regroup";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Performance span target.
    pub const PERF: &str = "horizon_items::perf";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_items_core::signal";
    /// Container generator target.
    pub const GENERATOR: &str = "horizon_items::generator";
    /// Collections and grouped views target.
    pub const COLLECTION: &str = "horizon_items::collection";
    /// Items control target.
    pub const ITEMS_CONTROL: &str = "horizon_items::items_control";
    /// Scroll viewer target.
    pub const SCROLL: &str = "horizon_items::scroll";
    /// Data grid column target.
    pub const DATA_GRID: &str = "horizon_items::data_grid";
}

/// A guard that keeps a tracing span entered until it is dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new(span_names::VERIFY);
    }

    #[test]
    fn test_perf_span_with_subscriber() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let _span = PerfSpan::new(span_names::REMOVE_ALL);
            tracing::trace!(target: targets::GENERATOR, "inside span");
        });
    }
}
