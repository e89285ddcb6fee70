//! Module: db::policy
//! Responsibility: mandatory access predicates keyed by role and by source tag.
//! Does not own: caller clause handling or plan assembly.
//! Boundary: tables are built once at startup and shared read-only; every
//! query path resolves both tables, and misses resolve to deny-all.

mod role;
mod source;


use thiserror::Error as ThisError;

pub use role::{RolePolicyTable, RoleRule, allow_all, operator_scope};
pub use source::{SourcePolicyTable, SourceRule};

///
/// PolicyError
///
/// A role rule could not produce a predicate for a well-formed identity.
/// Callers treat this as an invariant violation, never as "no restriction".
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PolicyError {
    #[error("policy for entity '{entity}' references missing column '{field}'")]
    MissingColumn { entity: String, field: String },

    #[error("policy rule failed: {0}")]
    Rule(String),
}

///
/// PolicySet
///
/// The pair of tables the engine consults on every query.
///

#[derive(Clone, Debug)]
pub struct PolicySet {
    pub roles: RolePolicyTable,
    pub sources: SourcePolicyTable,
}

impl PolicySet {
    #[must_use]
    pub const fn new(roles: RolePolicyTable, sources: SourcePolicyTable) -> Self {
        Self { roles, sources }
    }

    /// Default admin/operator roles with the standard source buckets.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(RolePolicyTable::standard(), SourcePolicyTable::standard())
    }
}
