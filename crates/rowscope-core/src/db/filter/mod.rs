//! Module: db::filter
//! Responsibility: caller filter vocabulary (operators, clauses, payload),
//! whitelist enforcement, and caller predicate construction.
//! Does not own: access policies or plan assembly.
//! Boundary: payloads are validated at deserialization; everything past this
//! module only sees well-formed clauses on whitelisted fields.

mod builder;
mod clause;
mod operator;
mod payload;
mod whitelist;


pub use builder::build_caller_predicate;
pub use clause::{ClauseError, ClauseOperand, FilterClause};
pub use operator::{ClauseOperator, OPERATOR_REGISTRY, OperatorArity, OperatorEntry};
pub use payload::{FilterPayload, OrderDirection, SourceTag, UnknownSourceTag};
pub use whitelist::retain_whitelisted;
