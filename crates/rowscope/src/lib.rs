//! Public facade for rowscope.
//!
//! ## Crate layout
//! - `core`: the engine (filters, policies, plans, executors, observability).
//! - `config`: TOML configuration model.
//! - `repository`: paginated read paths over an executor.
//! - `workflow`: batched status transitions.
//!
//! Callers construct `EngineSettings` once (from config or defaults) and
//! share it across requests.

pub use rowscope_config as config;
pub use rowscope_core as core;

pub mod error;
pub mod repository;
pub mod settings;
pub mod workflow;

pub use error::{
    Error, ErrorKind, ErrorOrigin, ExecutionErrorKind, QueryErrorKind, WorkflowErrorKind,
};
pub use repository::Repository;
pub use settings::{EngineSettings, PageRequest};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        EngineSettings, Error, PageRequest, Repository,
        core::{
            db::executor::{MemoryExecutor, Page, QueryExecutor},
            prelude::*,
        },
        workflow::{StatusService, StatusWriter},
    };
}
