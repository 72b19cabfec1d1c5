//! Resolver telemetry.
//!
//! Lock-free atomic counters updated by the limit resolver, and a
//! point-in-time snapshot for display.
//!
//! ```text
//! LimitResolver ─────► ResolverMetrics ─────► TelemetrySnapshot ─────► CLI
//!                      (atomic counters)      (point-in-time copy)
//! ```

mod metrics;
mod snapshot;

pub use metrics::ResolverMetrics;
pub use snapshot::TelemetrySnapshot;
