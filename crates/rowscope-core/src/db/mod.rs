//! Query compilation and execution surfaces.
//!
//! Data flows one way: `filter` validates caller input, `policy` supplies
//! access predicates, `engine` assembles a `plan`, and an `executor` runs it.

pub mod engine;
pub mod executor;
pub mod filter;
pub mod plan;
pub mod policy;
pub mod predicate;
