use crate::{
    db::filter::FilterClause,
    model::entity::EntityDescriptor,
    obs::sink::{MetricsEvent, record},
};

/// Keep only clauses whose field the entity lets callers filter on.
///
/// Clauses on any other field are dropped silently: no error is raised, so a
/// caller cannot probe column existence. A whitelisted name the descriptor
/// cannot resolve is dropped the same way.
#[must_use]
pub fn retain_whitelisted<'a>(
    entity: &dyn EntityDescriptor,
    clauses: &'a [FilterClause],
) -> Vec<&'a FilterClause> {
    clauses
        .iter()
        .filter(|clause| {
            let field = clause.field();
            let allowed = entity.is_filterable(field) && entity.resolve_column(field).is_some();
            if !allowed {
                tracing::warn!(
                    entity = entity.entity_name(),
                    field,
                    "dropping filter clause on non-whitelisted field"
                );
                record(MetricsEvent::ClauseDropped {
                    entity: entity.entity_name(),
                });
            }

            allowed
        })
        .collect()
}
