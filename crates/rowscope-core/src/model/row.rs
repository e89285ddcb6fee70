use crate::{error::InternalError, model::entity::EntityDescriptor, value::Value};
use serde::Serialize;

///
/// Row
///
/// One stored record, slot-aligned with its entity's field list.
/// Missing fields are materialized as `Value::Null`.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Build a row from `(field, value)` pairs, resolving names against the
    /// entity. Unknown field names are a model invariant violation.
    pub fn from_fields<I, K, V>(
        entity: &dyn EntityDescriptor,
        fields: I,
    ) -> Result<Self, InternalError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut values = vec![Value::Null; entity.column_count()];

        for (name, value) in fields {
            let name = name.as_ref();
            let column = entity.resolve_column(name).ok_or_else(|| {
                InternalError::model_invariant(format!(
                    "entity '{}' has no field '{name}'",
                    entity.entity_name()
                ))
            })?;
            let slot = values.get_mut(column.slot()).ok_or_else(|| {
                InternalError::model_invariant(format!(
                    "entity '{}' resolved field '{name}' outside its row width",
                    entity.entity_name()
                ))
            })?;
            *slot = value.into();
        }

        Ok(Self { values })
    }

    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&Value> {
        self.values.get(slot)
    }

    /// Value at `slot`, treating out-of-range slots as NULL.
    #[must_use]
    pub fn value_or_null(&self, slot: usize) -> &Value {
        self.values.get(slot).unwrap_or(&Value::Null)
    }

    /// Overwrite one slot; returns false when the slot is out of range.
    pub fn set(&mut self, slot: usize, value: Value) -> bool {
        match self.values.get_mut(slot) {
            Some(current) => {
                *current = value;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}
