//! Module: db::predicate
//! Responsibility: predicate AST, column resolution, and row evaluation.
//! Does not own: caller clause validation or access-policy decisions.
//! Boundary: filter/policy layers build `Predicate`; plans carry
//! `ResolvedPredicate`; executors evaluate it.

mod model;
mod resolved;
mod runtime;


pub use model::{CompareOp, ComparePredicate, Predicate};
pub use resolved::{ResolvedPredicate, UnresolvedField};
