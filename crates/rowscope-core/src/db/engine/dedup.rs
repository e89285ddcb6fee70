use crate::{
    db::{
        filter::FilterPayload,
        plan::{PlanNode, QueryPlan},
    },
    error::InternalError,
    model::entity::{ColumnHandle, EntityDescriptor},
};

/// Wrap `plan` in a top-1-per-group node when `distinct_by` names a
/// whitelisted column.
///
/// Any other `distinct_by` leaves the plan unchanged. An absent, unknown, or
/// non-whitelisted `distinct_by_order` falls back to the primary key.
pub(super) fn apply_dedup(
    entity: &dyn EntityDescriptor,
    plan: QueryPlan,
    payload: &FilterPayload,
) -> Result<QueryPlan, InternalError> {
    let Some(field) = payload.distinct_by.as_deref() else {
        return Ok(plan);
    };
    let Some(key) = caller_column(entity, field) else {
        tracing::debug!(
            entity = entity.entity_name(),
            field,
            "distinct_by is not a whitelisted column; skipping dedup"
        );
        return Ok(plan);
    };

    let tie_break = primary_key(entity)?;
    let order = payload
        .distinct_by_order
        .as_deref()
        .and_then(|name| caller_column(entity, name))
        .unwrap_or_else(|| tie_break.clone());
    let direction = payload.distinct_by_order_direction;

    Ok(plan.wrap(|input| PlanNode::Distinct {
        input,
        key,
        order,
        direction,
        tie_break,
    }))
}

pub(super) fn primary_key(entity: &dyn EntityDescriptor) -> Result<ColumnHandle, InternalError> {
    entity.resolve_column(entity.primary_key()).ok_or_else(|| {
        InternalError::model_invariant(format!(
            "entity '{}' primary key '{}' does not resolve",
            entity.entity_name(),
            entity.primary_key()
        ))
    })
}

/// Column a caller may order or group by: same rule as clause whitelisting.
pub(super) fn caller_column(entity: &dyn EntityDescriptor, field: &str) -> Option<ColumnHandle> {
    if !entity.is_filterable(field) {
        return None;
    }

    entity.resolve_column(field)
}
