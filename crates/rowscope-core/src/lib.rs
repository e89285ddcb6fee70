//! Core runtime for rowscope: filter vocabulary, access policies, query plan
//! assembly, and the in-memory executor, plus the domain vocabulary exported
//! via the `prelude`.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod db;
pub mod error;
pub mod identity;
pub mod model;
pub mod obs;
pub mod types;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, executors, or engine internals are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::filter::{FilterClause, FilterPayload, OrderDirection, SourceTag},
        identity::{Identity, Role},
        model::{entity::EntityModel, row::Row, status::RecordStatus},
        value::Value,
    };
}
