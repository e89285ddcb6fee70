mod common;

use common::*;
use rowscope::{
    ErrorKind, ExecutionErrorKind, QueryErrorKind, WorkflowErrorKind,
    config::RowscopeConfig,
    core::{
        db::{executor::ExecutionError, plan::QueryPlan},
        model::entity::EntityDescriptor,
        obs::metrics_report,
    },
    prelude::*,
    workflow::{StatusChange, StatusUpdate},
};
use std::{
    future::Future,
    sync::atomic::{AtomicUsize, Ordering},
};

fn settings_with_batch(batch_size: usize) -> EngineSettings {
    let config = RowscopeConfig::from_toml_str(&format!("[workflow]\nbatch_size = {batch_size}\n"))
        .expect("config");

    EngineSettings::from_config(&config).expect("settings")
}

fn owned_in_progress(count: i64) -> MemoryExecutor {
    store((1..=count).map(|id| voice(id, "v", "IN_PROGRESS", Some(99), 0.5)))
}

///
/// FlakyWriter
/// Reads from the wrapped store; fails the batch with index `fail_at`.
///

struct FlakyWriter {
    inner: MemoryExecutor,
    fail_at: usize,
    calls: AtomicUsize,
}

impl FlakyWriter {
    const fn new(inner: MemoryExecutor, fail_at: usize) -> Self {
        Self {
            inner,
            fail_at,
            calls: AtomicUsize::new(0),
        }
    }
}

impl QueryExecutor for FlakyWriter {
    fn fetch(
        &self,
        plan: &QueryPlan,
    ) -> impl Future<Output = Result<Vec<Row>, ExecutionError>> + Send {
        self.inner.fetch(plan)
    }

    fn count(&self, plan: &QueryPlan) -> impl Future<Output = Result<u64, ExecutionError>> + Send {
        self.inner.count(plan)
    }
}

impl StatusWriter for FlakyWriter {
    fn apply_batch(
        &self,
        entity: &dyn EntityDescriptor,
        ids: &[Value],
        update: &StatusUpdate,
    ) -> impl Future<Output = Result<u64, ExecutionError>> + Send {
        let fail = self.calls.fetch_add(1, Ordering::SeqCst) == self.fail_at;

        async move {
            if fail {
                return Err(ExecutionError::Timeout { after_ms: 250 });
            }
            self.inner.apply_batch(entity, ids, update).await
        }
    }
}

#[tokio::test]
async fn taking_unassigned_work_assigns_it_to_the_caller() {
    let executor = store([
        voice(1, "v1", "NEW", None, 0.9),
        voice(2, "v2", "NEW", Some(7), 0.4),
        voice(3, "v3", "IN_PROGRESS", Some(99), 0.7),
    ]);
    let settings = EngineSettings::default();
    let service = StatusService::new(Repository::new(&VOICE, &executor, &settings));
    let payload = FilterPayload::new().with_source(SourceTag::AssignmentArea);

    let change = service
        .change_status_by_filter(&payload, RecordStatus::InProgress, &OPERATOR)
        .await
        .expect("change");

    // row 2 belongs to someone else and is invisible to the operator
    assert_eq!(
        change,
        StatusChange {
            matched: 1,
            updated: 1,
            batches: 1
        }
    );
    assert_eq!(state_of(&executor, 1), ("IN_PROGRESS".to_string(), Value::Int(99)));
    assert_eq!(state_of(&executor, 2), ("NEW".to_string(), Value::Int(7)));
}

#[tokio::test]
async fn returning_work_to_the_queue_unassigns_it() {
    let executor = store([voice(1, "v1", "IN_PROGRESS", Some(99), 0.9)]);
    let settings = EngineSettings::default();
    let service = StatusService::new(Repository::new(&VOICE, &executor, &settings));
    let payload = FilterPayload::new().with_source(SourceTag::WorkArea);

    service
        .change_status_by_filter(&payload, RecordStatus::New, &OPERATOR)
        .await
        .expect("change");

    assert_eq!(state_of(&executor, 1), ("NEW".to_string(), Value::Null));
}

#[tokio::test]
async fn one_disallowed_row_rejects_the_whole_request() {
    let executor = store([
        voice(1, "v1", "IN_PROGRESS", Some(99), 0.9),
        voice(2, "v2", "NEW", None, 0.4),
    ]);
    let settings = EngineSettings::default();
    let service = StatusService::new(Repository::new(&VOICE, &executor, &settings));

    let err = service
        .change_status_by_filter(&FilterPayload::new(), RecordStatus::Confirmed, &ADMIN)
        .await
        .expect_err("row 2 is still NEW");

    assert_eq!(
        err.kind,
        ErrorKind::Workflow(WorkflowErrorKind::InvalidTransition)
    );
    assert_eq!(err.message, "row 2 cannot move from 'NEW' to CONFIRMED");
    assert_eq!(
        state_of(&executor, 1),
        ("IN_PROGRESS".to_string(), Value::Int(99))
    );
}

#[tokio::test]
async fn empty_match_is_not_found() {
    let executor = owned_in_progress(2);
    let settings = EngineSettings::default();
    let service = StatusService::new(Repository::new(&VOICE, &executor, &settings));
    let payload = FilterPayload::new().with_and(clause("status", "=", "CONFIRMED"));

    let err = service
        .change_status_by_filter(&payload, RecordStatus::Viewed, &ADMIN)
        .await
        .expect_err("nothing matches");

    assert_eq!(err.kind, ErrorKind::Query(QueryErrorKind::NotFound));
}

// Same shape as `voices` under its own name so the shared counters for this
// entity only see this test's writes.
static BATCHED_VOICE: EntityModel = EntityModel {
    entity_name: "batched_voices",
    primary_key: "id",
    fields: &[
        "id",
        "voice_id",
        "record_id",
        "status",
        "user_id",
        "probability",
    ],
    filter_whitelist: &["voice_id", "record_id", "status", "probability"],
};

#[tokio::test]
async fn updates_are_written_in_configured_batches() {
    let executor = MemoryExecutor::new();
    executor
        .extend(
            &BATCHED_VOICE,
            (1..=5).map(|id| {
                Row::from_fields(
                    &BATCHED_VOICE,
                    [
                        ("id", Value::Int(id)),
                        ("voice_id", Value::text("v")),
                        ("record_id", Value::Int(id * 10)),
                        ("status", Value::text("IN_PROGRESS")),
                        ("user_id", Value::Int(99)),
                        ("probability", float(0.5)),
                    ],
                )
                .expect("batched row")
            }),
        )
        .expect("seed rows");
    let settings = settings_with_batch(2);
    let service = StatusService::new(Repository::new(&BATCHED_VOICE, &executor, &settings));

    let change = service
        .change_status_by_filter(&FilterPayload::new(), RecordStatus::Confirmed, &OPERATOR)
        .await
        .expect("change");

    assert_eq!(change.batches, 3);
    assert_eq!(change.updated, 5);
    let rows = executor.rows("batched_voices").expect("rows");
    assert!(
        rows.iter()
            .all(|row| row.get(3).and_then(Value::as_text) == Some("CONFIRMED"))
    );

    // The service runs on the tokio test runtime; its counters are visible here.
    let counters = metrics_report(None).counters.expect("counters");
    let entity = &counters.entities["batched_voices"];
    assert_eq!(entity.batches_applied, 3);
    assert_eq!(entity.rows_updated, 5);
}

#[tokio::test]
async fn failed_batch_keeps_earlier_batches_committed() {
    let writer = FlakyWriter::new(owned_in_progress(5), 1);
    let settings = settings_with_batch(2);
    let service = StatusService::new(Repository::new(&VOICE, &writer, &settings));

    let err = service
        .change_status_by_filter(&FilterPayload::new(), RecordStatus::Confirmed, &OPERATOR)
        .await
        .expect_err("second batch fails");

    assert_eq!(
        err.kind,
        ErrorKind::Workflow(WorkflowErrorKind::PartiallyApplied)
    );
    assert!(err.message.starts_with("1 of 3 batches committed"), "{err}");

    let statuses: Vec<String> = (1..=5).map(|id| state_of(&writer.inner, id).0).collect();
    assert_eq!(
        statuses,
        vec![
            "CONFIRMED",
            "CONFIRMED",
            "IN_PROGRESS",
            "IN_PROGRESS",
            "IN_PROGRESS"
        ]
    );
}

#[tokio::test]
async fn failed_first_batch_is_a_plain_execution_error() {
    let writer = FlakyWriter::new(owned_in_progress(3), 0);
    let settings = settings_with_batch(2);
    let service = StatusService::new(Repository::new(&VOICE, &writer, &settings));

    let err = service
        .change_status_by_filter(&FilterPayload::new(), RecordStatus::Viewed, &OPERATOR)
        .await
        .expect_err("first batch fails");

    assert_eq!(err.kind, ErrorKind::Execution(ExecutionErrorKind::Timeout));
    assert!(err.is_retryable());
    assert_eq!(state_of(&writer.inner, 1).0, "IN_PROGRESS");
}
