use crate::db::{filter::FilterClause, predicate::Predicate};

/// Build the caller predicate from whitelisted AND and OR groups.
///
/// An empty group contributes nothing; both empty yields `TRUE`. Clause order
/// is preserved inside each group so plan text stays deterministic.
#[must_use]
pub fn build_caller_predicate(and: &[&FilterClause], or: &[&FilterClause]) -> Predicate {
    let group = |clauses: &[&FilterClause]| -> Vec<Predicate> {
        clauses.iter().map(|clause| clause.to_predicate()).collect()
    };

    let and_expr = (!and.is_empty()).then(|| Predicate::and(group(and)));
    let or_expr = (!or.is_empty()).then(|| Predicate::or(group(or)));

    match (and_expr, or_expr) {
        (Some(and_expr), Some(or_expr)) => Predicate::and(vec![and_expr, or_expr]),
        (Some(expr), None) | (None, Some(expr)) => expr,
        (None, None) => Predicate::True,
    }
}
