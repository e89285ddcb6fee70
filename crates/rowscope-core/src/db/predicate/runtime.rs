use crate::{
    db::predicate::{CompareOp, ResolvedPredicate},
    model::row::Row,
    value::{Value, compare_eq, compare_order},
};
use std::cmp::Ordering;

impl ResolvedPredicate {
    /// Evaluate against one row.
    ///
    /// Comparisons follow SQL NULL semantics: any comparison involving a NULL
    /// column value (including `!=` and `NOT IN`) is a non-match, as is any
    /// comparison between non-comparable variants.
    #[must_use]
    pub fn eval(&self, row: &Row) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::And(children) => children.iter().all(|child| child.eval(row)),
            Self::Or(children) => children.iter().any(|child| child.eval(row)),
            Self::Not(inner) => !inner.eval(row),
            Self::Compare { column, op, value } => {
                eval_compare(row.value_or_null(column.slot()), *op, value)
            }
            Self::Between {
                column,
                lower,
                upper,
            } => {
                let actual = row.value_or_null(column.slot());
                compare_order(actual, lower).is_some_and(Ordering::is_ge)
                    && compare_order(actual, upper).is_some_and(Ordering::is_le)
            }
            Self::IsNull { column } => row.value_or_null(column.slot()).is_null(),
            Self::IsNotNull { column } => !row.value_or_null(column.slot()).is_null(),
        }
    }
}

// Shared compare-op semantics; `None` from a comparison helper is a non-match.
fn eval_compare(actual: &Value, op: CompareOp, value: &Value) -> bool {
    match op {
        CompareOp::Eq => compare_eq(actual, value).unwrap_or(false),
        CompareOp::Ne => compare_eq(actual, value).is_some_and(|v| !v),

        CompareOp::Lt => compare_order(actual, value).is_some_and(Ordering::is_lt),
        CompareOp::Lte => compare_order(actual, value).is_some_and(Ordering::is_le),
        CompareOp::Gt => compare_order(actual, value).is_some_and(Ordering::is_gt),
        CompareOp::Gte => compare_order(actual, value).is_some_and(Ordering::is_ge),

        CompareOp::In => in_list(actual, value).unwrap_or(false),
        CompareOp::NotIn => in_list(actual, value).is_some_and(|matched| !matched),
    }
}

// Check whether a value equals any element in a list.
fn in_list(actual: &Value, list: &Value) -> Option<bool> {
    let Value::List(items) = list else {
        return None;
    };
    if actual.is_null() {
        return None;
    }

    let mut saw_valid = false;
    for item in items {
        match compare_eq(actual, item) {
            Some(true) => return Some(true),
            Some(false) => saw_valid = true,
            None => {}
        }
    }

    saw_valid.then_some(false)
}
