//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Structured logs go through `tracing`; counters go through `MetricsSink`.
//! Nothing in this module inspects plans or rows directly.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EntityCounters, EventOps, EventReport, EventState};
pub use sink::{
    MetricsEvent, MetricsSink, PolicyKind, metrics_report, metrics_reset_all, record,
    with_metrics_sink,
};
