//! Module: db::executor
//! Responsibility: the executor contract and concurrent page fetch.
//! Does not own: plan assembly; executors receive finished plans.
//! Boundary: an executor may run on any runtime; failures surface as one
//! `ExecutionError` per operation.

mod memory;


use crate::{
    db::plan::QueryPlan,
    model::row::Row,
    obs::sink::{MetricsEvent, record},
};
use std::future::Future;
use thiserror::Error as ThisError;

pub use memory::{Assignment, MemoryExecutor};

///
/// ExecutionError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ExecutionError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("store rejected the plan: {0}")]
    Rejected(String),

    #[error("store operation cancelled")]
    Cancelled,
}

impl ExecutionError {
    /// Connectivity-style failures a caller may retry later.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

///
/// QueryExecutor
///
/// Runs plans against a store. `count` receives a count projection built by
/// `QueryPlan::count`.
///

pub trait QueryExecutor: Sync {
    fn fetch(
        &self,
        plan: &QueryPlan,
    ) -> impl Future<Output = Result<Vec<Row>, ExecutionError>> + Send;

    fn count(&self, plan: &QueryPlan) -> impl Future<Output = Result<u64, ExecutionError>> + Send;
}

///
/// Page
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Page {
    pub rows: Vec<Row>,
    /// Row count of the plan without limit or offset.
    pub total: u64,
}

/// Fetch rows and the unpaginated total concurrently.
///
/// Both branches run over the same plan; if either fails the page fails and
/// no partial result is returned.
pub async fn fetch_page<X: QueryExecutor>(
    executor: &X,
    plan: &QueryPlan,
) -> Result<Page, ExecutionError> {
    let count_plan = plan.count();
    let (rows, total) = tokio::try_join!(executor.fetch(plan), executor.count(&count_plan))?;

    record(MetricsEvent::FetchFinished {
        entity: plan.entity(),
        rows: rows.len() as u64,
    });
    record(MetricsEvent::CountFinished {
        entity: plan.entity(),
    });

    Ok(Page { rows, total })
}
