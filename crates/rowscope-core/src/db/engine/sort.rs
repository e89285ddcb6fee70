use crate::{
    db::{
        engine::dedup::{caller_column, primary_key},
        filter::FilterPayload,
        plan::{PlanNode, QueryPlan},
    },
    error::InternalError,
    model::entity::EntityDescriptor,
    obs::sink::{MetricsEvent, record},
};

/// Order `plan` by the payload's `order_by`, ties by primary key.
///
/// A sort column callers may not filter on, or that does not resolve, is
/// ignored, not an error.
pub(super) fn apply_sort(
    entity: &dyn EntityDescriptor,
    plan: QueryPlan,
    payload: &FilterPayload,
) -> Result<QueryPlan, InternalError> {
    let Some(field) = payload.order_by.as_deref() else {
        return Ok(plan);
    };
    let Some(column) = caller_column(entity, field) else {
        tracing::debug!(
            entity = entity.entity_name(),
            field,
            "order_by is not a whitelisted column; ignoring sort"
        );
        record(MetricsEvent::SortIgnored {
            entity: entity.entity_name(),
        });
        return Ok(plan);
    };

    let tie_break = primary_key(entity)?;
    let direction = payload.order_direction;

    Ok(plan.wrap(|input| PlanNode::Sort {
        input,
        column,
        direction,
        tie_break,
    }))
}
