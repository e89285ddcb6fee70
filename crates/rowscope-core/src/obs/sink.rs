//! Metrics sink boundary.
//!
//! Engine and executor logic never touch `obs::metrics` directly.
//! All instrumentation flows through `MetricsEvent` and `MetricsSink`.
use crate::{
    db::plan::PipelineMode,
    obs::metrics::{self, entity_mut},
};
use std::sync::{Arc, PoisonError, RwLock};

static SINK_OVERRIDE: RwLock<Option<Arc<dyn MetricsSink>>> = RwLock::new(None);

///
/// PolicyKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PolicyKind {
    Role,
    Source,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent<'a> {
    PlanBuilt {
        entity: &'a str,
        mode: PipelineMode,
        dedup: bool,
    },
    ClauseDropped {
        entity: &'a str,
    },
    SortIgnored {
        entity: &'a str,
    },
    PolicyMiss {
        kind: PolicyKind,
    },
    FetchFinished {
        entity: &'a str,
        rows: u64,
    },
    CountFinished {
        entity: &'a str,
    },
    BatchApplied {
        entity: &'a str,
        rows: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent<'_>);
}

///
/// GlobalMetricsSink
/// Default sink that writes into the metrics state.
/// Acts as the concrete sink when no scoped override is installed.
///

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::PlanBuilt {
                entity,
                mode,
                dedup,
            } => {
                match mode {
                    PipelineMode::Flat => m.ops.plans_flat = m.ops.plans_flat.saturating_add(1),
                    PipelineMode::Staged => {
                        m.ops.plans_staged = m.ops.plans_staged.saturating_add(1);
                    }
                }
                if dedup {
                    m.ops.plans_dedup = m.ops.plans_dedup.saturating_add(1);
                }
                let entry = entity_mut(m, entity);
                entry.plans = entry.plans.saturating_add(1);
            }

            MetricsEvent::ClauseDropped { entity } => {
                m.ops.clauses_dropped = m.ops.clauses_dropped.saturating_add(1);
                let entry = entity_mut(m, entity);
                entry.clauses_dropped = entry.clauses_dropped.saturating_add(1);
            }

            MetricsEvent::SortIgnored { entity } => {
                m.ops.sorts_ignored = m.ops.sorts_ignored.saturating_add(1);
                let entry = entity_mut(m, entity);
                entry.sorts_ignored = entry.sorts_ignored.saturating_add(1);
            }

            MetricsEvent::PolicyMiss { kind } => match kind {
                PolicyKind::Role => {
                    m.ops.role_policy_misses = m.ops.role_policy_misses.saturating_add(1);
                }
                PolicyKind::Source => {
                    m.ops.source_policy_misses = m.ops.source_policy_misses.saturating_add(1);
                }
            },

            MetricsEvent::FetchFinished { entity, rows } => {
                m.ops.fetch_calls = m.ops.fetch_calls.saturating_add(1);
                m.ops.rows_fetched = m.ops.rows_fetched.saturating_add(rows);
                let entry = entity_mut(m, entity);
                entry.fetch_calls = entry.fetch_calls.saturating_add(1);
                entry.rows_fetched = entry.rows_fetched.saturating_add(rows);
            }

            MetricsEvent::CountFinished { entity } => {
                m.ops.count_calls = m.ops.count_calls.saturating_add(1);
                let entry = entity_mut(m, entity);
                entry.count_calls = entry.count_calls.saturating_add(1);
            }

            MetricsEvent::BatchApplied { entity, rows } => {
                m.ops.batches_applied = m.ops.batches_applied.saturating_add(1);
                m.ops.rows_updated = m.ops.rows_updated.saturating_add(rows);
                let entry = entity_mut(m, entity);
                entry.batches_applied = entry.batches_applied.saturating_add(1);
                entry.rows_updated = entry.rows_updated.saturating_add(rows);
            }
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

/// Route one event to the scoped override, or the global sink when none is set.
pub fn record(event: MetricsEvent<'_>) {
    let sink = SINK_OVERRIDE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state for endpoint/test plumbing.
///
/// `window_start_ms` filters by window start (`EventState::since_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary process-wide metrics sink override.
///
/// Events recorded on any thread while `f` runs go to `sink`. The previous
/// override is restored on every exit path, including unwind.
pub fn with_metrics_sink<T>(sink: Arc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Arc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            *SINK_OVERRIDE.write().unwrap_or_else(PoisonError::into_inner) = prev;
        }
    }

    let prev = SINK_OVERRIDE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(sink);
    let _guard = Guard(prev);

    f()
}
