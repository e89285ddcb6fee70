//! Module: workflow
//! Responsibility: status transitions over role-scoped filtered rows, written
//! in atomic batches.
//! Does not own: row visibility; the rows a caller may touch are exactly the
//! rows the role policy lets them read.
//! Boundary: each batch commits on its own; a failed batch never rolls back
//! the batches before it.


use crate::{Error, Repository};
use rowscope_core::{
    db::{
        executor::{Assignment, ExecutionError, MemoryExecutor, QueryExecutor},
        filter::FilterPayload,
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    identity::Identity,
    model::{
        entity::{ColumnHandle, EntityDescriptor},
        status::RecordStatus,
    },
    obs::{MetricsEvent, record},
    value::Value,
};
use std::future::{Future, ready};
use thiserror::Error as ThisError;

const STATUS_FIELD: &str = "status";
const ASSIGNEE_FIELD: &str = "user_id";

///
/// WorkflowError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum WorkflowError {
    #[error("no '{entity}' rows match the filter")]
    NotFound { entity: String },

    #[error("row {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Value,
        from: Value,
        to: RecordStatus,
    },

    #[error("{committed} of {total} batches committed before a batch failed: {source}")]
    PartiallyApplied {
        committed: usize,
        total: usize,
        #[source]
        source: ExecutionError,
    },
}

/// Statuses a row must currently hold to move to `target`.
#[must_use]
pub const fn allowed_sources(target: RecordStatus) -> &'static [RecordStatus] {
    match target {
        RecordStatus::New => &[RecordStatus::InProgress],
        RecordStatus::InProgress => &[RecordStatus::New],
        RecordStatus::Changed | RecordStatus::Confirmed | RecordStatus::Viewed => {
            &[RecordStatus::InProgress]
        }
    }
}

#[must_use]
pub fn can_transition(from: RecordStatus, to: RecordStatus) -> bool {
    allowed_sources(to).contains(&from)
}

///
/// Assignee
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Assignee {
    Keep,
    Assign(i64),
    Unassign,
}

///
/// StatusUpdate
/// Column writes applied to every row of a batch.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusUpdate {
    pub status: RecordStatus,
    pub assignee: Assignee,
}

impl StatusUpdate {
    /// Taking work assigns it to the caller; returning it to `NEW` releases it.
    #[must_use]
    pub const fn for_transition(target: RecordStatus, identity: &Identity) -> Self {
        let assignee = match target {
            RecordStatus::InProgress => Assignee::Assign(identity.id),
            RecordStatus::New => Assignee::Unassign,
            RecordStatus::Changed | RecordStatus::Confirmed | RecordStatus::Viewed => {
                Assignee::Keep
            }
        };

        Self {
            status: target,
            assignee,
        }
    }
}

///
/// StatusWriter
///
/// Store capability for batched status writes. One call is one atomic unit.
///

pub trait StatusWriter: Sync {
    fn apply_batch(
        &self,
        entity: &dyn EntityDescriptor,
        ids: &[Value],
        update: &StatusUpdate,
    ) -> impl Future<Output = Result<u64, ExecutionError>> + Send;
}

impl StatusWriter for MemoryExecutor {
    fn apply_batch(
        &self,
        entity: &dyn EntityDescriptor,
        ids: &[Value],
        update: &StatusUpdate,
    ) -> impl Future<Output = Result<u64, ExecutionError>> + Send {
        ready(memory_batch(self, entity, ids, update))
    }
}

fn memory_batch(
    store: &MemoryExecutor,
    entity: &dyn EntityDescriptor,
    ids: &[Value],
    update: &StatusUpdate,
) -> Result<u64, ExecutionError> {
    let resolve = |name: &str| {
        entity.resolve_column(name).ok_or_else(|| {
            ExecutionError::Rejected(format!(
                "entity '{}' has no column '{name}'",
                entity.entity_name()
            ))
        })
    };

    let key = resolve(entity.primary_key())?;
    let mut assignments = vec![Assignment::new(resolve(STATUS_FIELD)?, update.status.into())];
    match update.assignee {
        Assignee::Keep => {}
        Assignee::Assign(id) => {
            assignments.push(Assignment::new(resolve(ASSIGNEE_FIELD)?, Value::Int(id)));
        }
        Assignee::Unassign => {
            assignments.push(Assignment::new(resolve(ASSIGNEE_FIELD)?, Value::Null));
        }
    }

    store.update_where_in(entity.entity_name(), &key, ids, &assignments)
}

///
/// StatusChange
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusChange {
    /// Rows the filter matched for the caller.
    pub matched: usize,
    /// Rows the store reported as written.
    pub updated: u64,
    pub batches: usize,
}

///
/// StatusService
///

pub struct StatusService<'a, X> {
    repository: Repository<'a, X>,
}

impl<'a, X: QueryExecutor + StatusWriter> StatusService<'a, X> {
    #[must_use]
    pub const fn new(repository: Repository<'a, X>) -> Self {
        Self { repository }
    }

    /// Move every row the caller can see through `payload` to `target`.
    ///
    /// All rows are checked before the first write: one row in a disallowed
    /// status fails the whole request with nothing written.
    pub async fn change_status_by_filter(
        &self,
        payload: &FilterPayload,
        target: RecordStatus,
        identity: &Identity,
    ) -> Result<StatusChange, Error> {
        let descriptor = self.repository.descriptor();
        let entity = descriptor.entity_name();
        let key = model_column(descriptor, descriptor.primary_key())?;
        let status = model_column(descriptor, STATUS_FIELD)?;

        let rows = self.repository.load_all(payload, identity).await?;
        if rows.is_empty() {
            return Err(WorkflowError::NotFound {
                entity: entity.to_string(),
            }
            .into());
        }

        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            let current = row.value_or_null(status.slot());
            let allowed = RecordStatus::from_value(current)
                .is_some_and(|current| can_transition(current, target));
            if !allowed {
                return Err(WorkflowError::InvalidTransition {
                    id: row.value_or_null(key.slot()).clone(),
                    from: current.clone(),
                    to: target,
                }
                .into());
            }
            ids.push(row.value_or_null(key.slot()).clone());
        }

        let update = StatusUpdate::for_transition(target, identity);
        let batch_size = self.repository.settings().batch_size.max(1);
        let total = ids.len().div_ceil(batch_size);
        let writer = self.repository.executor();

        let mut updated = 0u64;
        for (committed, batch) in ids.chunks(batch_size).enumerate() {
            match writer.apply_batch(descriptor, batch, &update).await {
                Ok(rows) => {
                    updated = updated.saturating_add(rows);
                    record(MetricsEvent::BatchApplied { entity, rows });
                }
                Err(err) if committed == 0 => return Err(err.into()),
                Err(source) => {
                    tracing::warn!(
                        entity,
                        committed,
                        total,
                        error = %source,
                        "status batch failed after earlier batches committed"
                    );
                    return Err(WorkflowError::PartiallyApplied {
                        committed,
                        total,
                        source,
                    }
                    .into());
                }
            }
        }

        tracing::debug!(entity, %target, matched = rows.len(), updated, "status change applied");

        Ok(StatusChange {
            matched: rows.len(),
            updated,
            batches: total,
        })
    }
}

fn model_column(entity: &dyn EntityDescriptor, name: &str) -> Result<ColumnHandle, InternalError> {
    entity.resolve_column(name).ok_or_else(|| {
        InternalError::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Model,
            format!(
                "entity '{}' has no '{name}' column for status changes",
                entity.entity_name()
            ),
        )
    })
}
