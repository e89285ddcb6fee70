//! Shared entity and row fixtures for unit tests.

use crate::{
    model::{entity::EntityModel, row::Row},
    value::Value,
};

pub(crate) static VOICE: EntityModel = EntityModel {
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

pub(crate) fn float(v: f64) -> Value {
    Value::float(v).expect("finite float")
}

pub(crate) fn voice_row(
    id: i64,
    voice_id: &str,
    status: &str,
    user_id: Option<i64>,
    probability: f64,
) -> Row {
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

pub(crate) fn row_id(row: &Row) -> i64 {
    row.get(0).and_then(Value::as_int).expect("id column")
}
