//! Fixtures shared by the facade integration tests.
#![allow(dead_code)]

use rowscope::{
    core::{
        db::executor::{ExecutionError, MemoryExecutor, QueryExecutor},
        db::plan::QueryPlan,
    },
    prelude::*,
};
use std::future::{Future, ready};

pub static VOICE: EntityModel = EntityModel {
    entity_name: "voices",
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

pub const ADMIN: Identity = Identity::new(1, Role::Admin);
pub const OPERATOR: Identity = Identity::new(99, Role::Operator);

pub fn float(v: f64) -> Value {
    Value::float(v).expect("finite float")
}

pub fn voice(id: i64, voice_id: &str, status: &str, user_id: Option<i64>, probability: f64) -> Row {
    Row::from_fields(
        &VOICE,
        [
            ("id", Value::Int(id)),
            ("voice_id", Value::text(voice_id)),
            ("record_id", Value::Int(id * 10)),
            ("status", Value::text(status)),
            ("user_id", Value::from(user_id)),
            ("probability", float(probability)),
        ],
    )
    .expect("voice row")
}

pub fn store(rows: impl IntoIterator<Item = Row>) -> MemoryExecutor {
    let executor = MemoryExecutor::new();
    executor.extend(&VOICE, rows).expect("seed rows");
    executor
}

pub fn ids(rows: &[Row]) -> Vec<i64> {
    rows.iter()
        .map(|row| row.get(0).and_then(Value::as_int).expect("id column"))
        .collect()
}

pub fn clause(field: &str, op: &str, value: impl Into<Value>) -> FilterClause {
    FilterClause::new(field, op, value).expect("valid clause")
}

/// Stored `(status, user_id)` for row `id`.
pub fn state_of(executor: &MemoryExecutor, id: i64) -> (String, Value) {
    let rows = executor.rows(VOICE.entity_name).expect("rows");
    let row = rows
        .iter()
        .find(|row| row.get(0) == Some(&Value::Int(id)))
        .expect("row present");

    (
        row.get(3).and_then(Value::as_text).expect("status").to_string(),
        row.get(4).cloned().expect("user_id slot"),
    )
}

///
/// DownStore
/// Executor whose store is unreachable.
///

pub struct DownStore;

impl QueryExecutor for DownStore {
    fn fetch(
        &self,
        _plan: &QueryPlan,
    ) -> impl Future<Output = Result<Vec<Row>, ExecutionError>> + Send {
        ready(Err(ExecutionError::Unavailable("connection refused".to_string())))
    }

    fn count(&self, _plan: &QueryPlan) -> impl Future<Output = Result<u64, ExecutionError>> + Send {
        ready(Err(ExecutionError::Unavailable("connection refused".to_string())))
    }
}
