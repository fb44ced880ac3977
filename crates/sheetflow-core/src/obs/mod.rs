//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Text diagnostics go through the `log` facade at the call sites; this
//! module only carries structured counters.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{AggregationSummary, EventReport, EventState};
pub use sink::{
    MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, set_metrics_enabled,
    with_metrics_sink,
};
