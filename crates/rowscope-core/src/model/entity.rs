//! Module: model::entity
//! Responsibility: entity descriptors and field-name → column resolution.
//! Does not own: filter whitelisting decisions or predicate semantics.
//! Boundary: consumed by the filter engine, policies, and executors.

///
/// ColumnHandle
///
/// Resolved column reference: the field's slot in a stored row plus its name
/// for explain output. Produced only by `EntityDescriptor::resolve_column`.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ColumnHandle {
    slot: usize,
    name: String,
}

impl ColumnHandle {
    #[must_use]
    pub fn new(slot: usize, name: impl Into<String>) -> Self {
        Self {
            slot,
            name: name.into(),
        }
    }

    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

///
/// EntityDescriptor
///
/// Capability interface for one queryable entity.
///
/// Resolution is explicit: unknown names resolve to `None` rather than being
/// looked up reflectively. `is_filterable` is the caller-facing whitelist and
/// is deliberately narrower than the set of resolvable columns; policies may
/// reference columns callers cannot filter on.
///

pub trait EntityDescriptor: Send + Sync {
    /// Stable external name of the entity (the table name in explain output).
    fn entity_name(&self) -> &str;

    /// Name of the primary-key column used for deterministic tie-breaks.
    fn primary_key(&self) -> &str;

    /// Number of columns in a stored row.
    fn column_count(&self) -> usize;

    /// Whether callers may filter on this field.
    fn is_filterable(&self, field: &str) -> bool;

    /// Resolve a field name to its column handle.
    fn resolve_column(&self, name: &str) -> Option<ColumnHandle>;
}

///
/// EntityModel
/// Static runtime model for one entity.
///

#[derive(Debug)]
pub struct EntityModel {
    /// Stable external name used in plans and routing.
    pub entity_name: &'static str,
    /// Primary key field (must name an entry in `fields`).
    pub primary_key: &'static str,
    /// Ordered field list; position is the row slot.
    pub fields: &'static [&'static str],
    /// Fields callers may reference in filter clauses.
    pub filter_whitelist: &'static [&'static str],
}

impl EntityModel {
    /// Resolve a field name to its slot in the ordered field list.
    #[must_use]
    pub fn field_slot(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| *field == name)
    }
}

impl EntityDescriptor for EntityModel {
    fn entity_name(&self) -> &str {
        self.entity_name
    }

    fn primary_key(&self) -> &str {
        self.primary_key
    }

    fn column_count(&self) -> usize {
        self.fields.len()
    }

    fn is_filterable(&self, field: &str) -> bool {
        self.filter_whitelist.contains(&field)
    }

    fn resolve_column(&self, name: &str) -> Option<ColumnHandle> {
        self.field_slot(name).map(|slot| ColumnHandle::new(slot, name))
    }
}
