use crate::workflow::WorkflowError;
use derive_more::Display;
use rowscope_config::ConfigError;
use rowscope_core::{
    db::{
        engine::QueryError,
        executor::ExecutionError,
        filter::{ClauseError, UnknownSourceTag},
        plan::PlanError,
    },
    error::{ErrorOrigin as CoreErrorOrigin, InternalError},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    /// Whether retrying the same request later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Execution(ExecutionErrorKind::Unavailable | ExecutionErrorKind::Timeout)
        )
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        Self::new(ErrorKind::Internal, err.origin.into(), err.message)
    }
}

impl From<ClauseError> for Error {
    fn from(err: ClauseError) -> Self {
        Self::new(
            ErrorKind::Query(QueryErrorKind::Invalid),
            ErrorOrigin::Query,
            err.to_string(),
        )
    }
}

impl From<PlanError> for Error {
    fn from(err: PlanError) -> Self {
        Self::new(
            ErrorKind::Query(QueryErrorKind::Invalid),
            ErrorOrigin::Plan,
            err.to_string(),
        )
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Plan(err) => err.into(),
            QueryError::Invariant(err) => err.into(),
        }
    }
}

impl From<ExecutionError> for Error {
    fn from(err: ExecutionError) -> Self {
        let kind = match err {
            ExecutionError::Unavailable(_) => ExecutionErrorKind::Unavailable,
            ExecutionError::Timeout { .. } => ExecutionErrorKind::Timeout,
            ExecutionError::Rejected(_) => ExecutionErrorKind::Rejected,
            ExecutionError::Cancelled => ExecutionErrorKind::Cancelled,
        };

        Self::new(ErrorKind::Execution(kind), ErrorOrigin::Executor, err.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::Config, ErrorOrigin::Config, err.to_string())
    }
}

impl From<UnknownSourceTag> for Error {
    fn from(err: UnknownSourceTag) -> Self {
        Self::new(ErrorKind::Config, ErrorOrigin::Config, err.to_string())
    }
}

impl From<WorkflowError> for Error {
    fn from(err: WorkflowError) -> Self {
        let kind = match &err {
            WorkflowError::NotFound { .. } => ErrorKind::Query(QueryErrorKind::NotFound),
            WorkflowError::InvalidTransition { .. } => {
                ErrorKind::Workflow(WorkflowErrorKind::InvalidTransition)
            }
            WorkflowError::PartiallyApplied { .. } => {
                ErrorKind::Workflow(WorkflowErrorKind::PartiallyApplied)
            }
        };

        Self::new(kind, ErrorOrigin::Workflow, err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Query(QueryErrorKind),
    Workflow(WorkflowErrorKind),
    Execution(ExecutionErrorKind),

    /// Configuration could not be loaded or is inconsistent.
    Config,

    /// The caller cannot remediate this.
    Internal,
}

///
/// QueryErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum QueryErrorKind {
    /// Malformed filter clause or plan request.
    Invalid,

    /// Valid request, but no rows matched.
    NotFound,
}

///
/// WorkflowErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum WorkflowErrorKind {
    /// At least one matched row cannot move to the requested status.
    InvalidTransition,

    /// Some batches committed before a later batch failed.
    PartiallyApplied,
}

///
/// ExecutionErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ExecutionErrorKind {
    Unavailable,
    Timeout,
    Rejected,
    Cancelled,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Config,
    Executor,
    Model,
    Plan,
    Policy,
    Query,
    Workflow,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Model => Self::Model,
            CoreErrorOrigin::Plan => Self::Plan,
            CoreErrorOrigin::Policy => Self::Policy,
        }
    }
}
