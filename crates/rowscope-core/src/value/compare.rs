use crate::value::Value;
use std::cmp::Ordering;

/// Total canonical comparator used by sort and dedup surfaces.
///
/// Ordering rules:
/// 1. Canonical variant rank (NULL < bool < number < text < list)
/// 2. Variant-specific comparison for same-ranked values
///
/// Integers and floats share a rank and compare numerically.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let rank = left.canonical_rank().cmp(&right.canonical_rank());
    if rank != Ordering::Equal {
        return rank;
    }

    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::List(a), Value::List(b)) => canonical_cmp_list(a, b),
        _ => cmp_numeric(left, right).unwrap_or(Ordering::Equal),
    }
}

/// Predicate ordering comparison.
///
/// Returns `None` when either side is NULL or the variants are not mutually
/// orderable; callers treat `None` as a non-match.
#[must_use]
pub fn compare_order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ => cmp_numeric(left, right),
    }
}

/// Predicate equality comparison.
///
/// Returns `None` when either side is NULL or the variants cannot be compared.
#[must_use]
pub fn compare_eq(left: &Value, right: &Value) -> Option<bool> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::List(_), _) | (_, Value::List(_)) => None,
        (Value::Bool(a), Value::Bool(b)) => Some(a == b),
        (Value::Text(a), Value::Text(b)) => Some(a == b),
        _ => cmp_numeric(left, right).map(Ordering::is_eq),
    }
}

// Numeric widening: mixed int/float pairs compare exactly, without
// rounding the integer through f64.
fn cmp_numeric(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float64(a), Value::Float64(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Float64(b)) => Some(cmp_int_float(*a, b.get())),
        (Value::Float64(a), Value::Int(b)) => Some(cmp_int_float(*b, a.get()).reverse()),
        _ => None,
    }
}

// 2^63, the first float above every i64.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

// `float` is finite (Float64 invariant).
#[allow(clippy::cast_possible_truncation)]
fn cmp_int_float(int: i64, float: f64) -> Ordering {
    if float >= I64_BOUND {
        return Ordering::Less;
    }
    if float < -I64_BOUND {
        return Ordering::Greater;
    }

    // in [-2^63, 2^63) the integral part converts to i64 exactly
    let whole = float.trunc();
    int.cmp(&(whole as i64)).then_with(|| {
        let fraction = float - whole;
        if fraction > 0.0 {
            Ordering::Less
        } else if fraction < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

fn canonical_cmp_list(left: &[Value], right: &[Value]) -> Ordering {
    for (left, right) in left.iter().zip(right.iter()) {
        let cmp = canonical_cmp(left, right);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    left.len().cmp(&right.len())
}

///
/// CanonicalValue
///
/// Map-key wrapper ordering values by `canonical_cmp`.
/// Used to group rows by a column value.
///

#[derive(Clone, Debug)]
pub struct CanonicalValue(pub Value);

impl PartialEq for CanonicalValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CanonicalValue {}

impl PartialOrd for CanonicalValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CanonicalValue {
    fn cmp(&self, other: &Self) -> Ordering {
        canonical_cmp(&self.0, &other.0)
    }
}
