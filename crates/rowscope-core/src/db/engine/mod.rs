//! Module: db::engine
//! Responsibility: compile a filter payload and identity into a query plan.
//! Does not own: executing plans or storing rows.
//! Boundary: pure and synchronous; holds only shared references to the
//! entity descriptor and the policy tables, so it is safe to call from many
//! tasks at once.

mod dedup;
mod pipeline;
mod sort;

#[cfg(test)]
mod tests;

use crate::{
    db::{
        filter::FilterPayload,
        plan::{PipelineMode, PlanError, QueryPlan},
        policy::PolicySet,
    },
    error::InternalError,
    identity::Identity,
    model::entity::EntityDescriptor,
    obs::sink::{MetricsEvent, record},
};
use thiserror::Error as ThisError;

///
/// QueryError
///
/// Planning failure. Policy misses are not errors (they resolve to deny-all);
/// an `Invariant` means a programming defect and must not be retried.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error("{0}")]
    Plan(#[from] PlanError),

    #[error("{0}")]
    Invariant(#[from] InternalError),
}

///
/// ApplyOptions
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ApplyOptions {
    /// Apply the payload's `order_by` when it names a known column.
    pub sorting: bool,
    pub mode: PipelineMode,
}

impl ApplyOptions {
    #[must_use]
    pub const fn new(sorting: bool, mode: PipelineMode) -> Self {
        Self { sorting, mode }
    }
}

///
/// FilterEngine
///

#[derive(Clone, Copy)]
pub struct FilterEngine<'a> {
    descriptor: &'a dyn EntityDescriptor,
    policies: &'a PolicySet,
}

impl<'a> FilterEngine<'a> {
    #[must_use]
    pub const fn new(descriptor: &'a dyn EntityDescriptor, policies: &'a PolicySet) -> Self {
        Self {
            descriptor,
            policies,
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &'a dyn EntityDescriptor {
        self.descriptor
    }

    /// Flat or staged filtered plan, optionally sorted.
    ///
    /// The role predicate is resolved on every call; there is no path that
    /// skips it.
    pub fn apply(
        &self,
        payload: &FilterPayload,
        identity: &Identity,
        base: Option<QueryPlan>,
        options: ApplyOptions,
    ) -> Result<QueryPlan, QueryError> {
        let plan = self.filtered(payload, identity, base, options.mode)?;
        let plan = if options.sorting {
            sort::apply_sort(self.descriptor, plan, payload)?
        } else {
            plan
        };

        Ok(self.finish(plan))
    }

    /// Staged filtered plan collapsed to the top row per `distinct_by` group,
    /// optionally sorted.
    pub fn apply_with_dedup(
        &self,
        payload: &FilterPayload,
        identity: &Identity,
        base: Option<QueryPlan>,
        sorting: bool,
    ) -> Result<QueryPlan, QueryError> {
        let plan = self.filtered(payload, identity, base, PipelineMode::Staged)?;
        let plan = dedup::apply_dedup(self.descriptor, plan, payload)?;
        let plan = if sorting {
            sort::apply_sort(self.descriptor, plan, payload)?
        } else {
            plan
        };

        Ok(self.finish(plan))
    }

    /// Count-only variant of `plan` over exactly the same filter and dedup
    /// stages.
    #[must_use]
    #[expect(clippy::unused_self)]
    pub fn count_of(&self, plan: &QueryPlan) -> QueryPlan {
        plan.count()
    }

    fn filtered(
        &self,
        payload: &FilterPayload,
        identity: &Identity,
        base: Option<QueryPlan>,
        mode: PipelineMode,
    ) -> Result<QueryPlan, QueryError> {
        let base = self.base_plan(base)?;
        let stages = pipeline::resolve_stages(self.descriptor, self.policies, payload, identity)?;

        Ok(pipeline::assemble(base, stages, mode))
    }

    fn base_plan(&self, base: Option<QueryPlan>) -> Result<QueryPlan, InternalError> {
        let Some(base) = base else {
            return Ok(QueryPlan::scan(self.descriptor));
        };

        let entity = self.descriptor.entity_name();
        if base.entity() != entity {
            return Err(InternalError::plan_invariant(format!(
                "base query targets '{}' but the engine is bound to '{entity}'",
                base.entity()
            )));
        }
        if !base.is_filtered_scan() {
            return Err(InternalError::plan_invariant(format!(
                "base query for '{entity}' must be a scan with optional unstaged filters"
            )));
        }

        Ok(base)
    }

    fn finish(&self, plan: QueryPlan) -> QueryPlan {
        let entity = self.descriptor.entity_name();
        let dedup = plan.has_distinct();

        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(
                entity,
                mode = %plan.mode(),
                dedup,
                stages = ?plan.stages(),
                fingerprint = %plan.fingerprint(),
                "assembled query plan"
            );
        }
        record(MetricsEvent::PlanBuilt {
            entity,
            mode: plan.mode(),
            dedup,
        });

        plan
    }
}
