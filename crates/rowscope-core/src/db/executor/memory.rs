use crate::{
    db::{
        executor::{ExecutionError, QueryExecutor},
        filter::OrderDirection,
        plan::{PlanNode, QueryPlan},
    },
    model::{
        entity::{ColumnHandle, EntityDescriptor},
        row::Row,
    },
    value::{CanonicalValue, Value, canonical_cmp},
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    future::{Future, ready},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

type Tables = BTreeMap<String, Vec<Row>>;

///
/// Assignment
/// One `column = value` write applied by `MemoryExecutor::update_where_in`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assignment {
    pub column: ColumnHandle,
    pub value: Value,
}

impl Assignment {
    #[must_use]
    pub const fn new(column: ColumnHandle, value: Value) -> Self {
        Self { column, value }
    }
}

///
/// MemoryExecutor
///
/// Reference executor over in-process tables. Evaluates every plan node with
/// the same semantics a relational store is expected to push down.
///

#[derive(Debug, Default)]
pub struct MemoryExecutor {
    tables: RwLock<Tables>,
}

impl MemoryExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entity: &dyn EntityDescriptor, row: Row) -> Result<(), ExecutionError> {
        self.extend(entity, [row])
    }

    pub fn extend(
        &self,
        entity: &dyn EntityDescriptor,
        rows: impl IntoIterator<Item = Row>,
    ) -> Result<(), ExecutionError> {
        let mut tables = self.write()?;
        tables
            .entry(entity.entity_name().to_string())
            .or_default()
            .extend(rows);

        Ok(())
    }

    /// Snapshot of every stored row of `entity`, in insertion order.
    pub fn rows(&self, entity: &str) -> Result<Vec<Row>, ExecutionError> {
        let tables = self.read()?;

        Ok(tables.get(entity).cloned().unwrap_or_default())
    }

    /// Apply `assignments` to every row whose `key` value is in `keys`.
    ///
    /// All matching rows are updated under one write lock, so the call is
    /// atomic. Returns the number of rows updated.
    pub fn update_where_in(
        &self,
        entity: &str,
        key: &ColumnHandle,
        keys: &[Value],
        assignments: &[Assignment],
    ) -> Result<u64, ExecutionError> {
        let wanted: BTreeSet<CanonicalValue> = keys.iter().cloned().map(CanonicalValue).collect();
        let mut tables = self.write()?;
        let rows = tables
            .get_mut(entity)
            .ok_or_else(|| ExecutionError::Rejected(format!("unknown entity '{entity}'")))?;

        // validate every slot before the first write
        for assignment in assignments {
            let in_range = rows
                .first()
                .is_none_or(|row| row.get(assignment.column.slot()).is_some());
            if !in_range {
                return Err(ExecutionError::Rejected(format!(
                    "column '{}' is outside the '{entity}' row width",
                    assignment.column.name()
                )));
            }
        }

        let mut updated = 0u64;
        for row in rows.iter_mut() {
            let id = CanonicalValue(row.value_or_null(key.slot()).clone());
            if !wanted.contains(&id) {
                continue;
            }
            for assignment in assignments {
                row.set(assignment.column.slot(), assignment.value.clone());
            }
            updated += 1;
        }

        Ok(updated)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, ExecutionError> {
        self.tables
            .read()
            .map_err(|_| ExecutionError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, ExecutionError> {
        self.tables
            .write()
            .map_err(|_| ExecutionError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Evaluate a row plan synchronously.
    pub fn execute(&self, plan: &QueryPlan) -> Result<Vec<Row>, ExecutionError> {
        let tables = self.read()?;

        evaluate(plan.root(), &tables)
    }

    /// Evaluate a count projection synchronously.
    pub fn execute_count(&self, plan: &QueryPlan) -> Result<u64, ExecutionError> {
        let PlanNode::Count { input } = plan.root() else {
            return Err(ExecutionError::Rejected(format!(
                "plan for '{}' is not a count projection",
                plan.entity()
            )));
        };
        let tables = self.read()?;
        let rows = evaluate(input, &tables)?;

        Ok(rows.len() as u64)
    }
}

impl QueryExecutor for MemoryExecutor {
    fn fetch(
        &self,
        plan: &QueryPlan,
    ) -> impl Future<Output = Result<Vec<Row>, ExecutionError>> + Send {
        ready(self.execute(plan))
    }

    fn count(&self, plan: &QueryPlan) -> impl Future<Output = Result<u64, ExecutionError>> + Send {
        ready(self.execute_count(plan))
    }
}

fn evaluate(node: &PlanNode, tables: &Tables) -> Result<Vec<Row>, ExecutionError> {
    match node {
        PlanNode::Scan { entity } => Ok(tables.get(entity).cloned().unwrap_or_default()),

        PlanNode::Filter {
            input, predicate, ..
        } => {
            let mut rows = evaluate(input, tables)?;
            rows.retain(|row| predicate.eval(row));
            Ok(rows)
        }

        PlanNode::Distinct {
            input,
            key,
            order,
            direction,
            tie_break,
        } => {
            let rows = evaluate(input, tables)?;
            Ok(distinct(rows, key, order, *direction, tie_break))
        }

        PlanNode::Sort {
            input,
            column,
            direction,
            tie_break,
        } => {
            let mut rows = evaluate(input, tables)?;
            rows.sort_by(|left, right| {
                directed(compare_at(left, right, column), *direction)
                    .then_with(|| compare_at(left, right, tie_break))
            });
            Ok(rows)
        }

        PlanNode::Page {
            input,
            limit,
            offset,
        } => {
            let rows = evaluate(input, tables)?;
            let skipped = rows.into_iter().skip(*offset as usize);
            Ok(match limit {
                Some(limit) => skipped.take(*limit as usize).collect(),
                None => skipped.collect(),
            })
        }

        PlanNode::Count { .. } => Err(ExecutionError::Rejected(
            "count projection cannot be fetched as rows".to_string(),
        )),
    }
}

// Top-1 per group, emitted in ascending group-key order.
fn distinct(
    rows: Vec<Row>,
    key: &ColumnHandle,
    order: &ColumnHandle,
    direction: OrderDirection,
    tie_break: &ColumnHandle,
) -> Vec<Row> {
    let mut groups: BTreeMap<CanonicalValue, Row> = BTreeMap::new();

    for row in rows {
        let group = CanonicalValue(row.value_or_null(key.slot()).clone());
        match groups.get_mut(&group) {
            Some(current) => {
                if outranks(&row, current, order, direction, tie_break) {
                    *current = row;
                }
            }
            None => {
                groups.insert(group, row);
            }
        }
    }

    groups.into_values().collect()
}

// NULL ordering values never beat a non-null one; exact ties go to the
// lower tie-break value.
fn outranks(
    candidate: &Row,
    current: &Row,
    order: &ColumnHandle,
    direction: OrderDirection,
    tie_break: &ColumnHandle,
) -> bool {
    let cand = candidate.value_or_null(order.slot());
    let curr = current.value_or_null(order.slot());

    match (cand.is_null(), curr.is_null()) {
        (true, false) => return false,
        (false, true) => return true,
        _ => {}
    }

    // Desc keeps the maximum, Asc the minimum
    match (canonical_cmp(cand, curr), direction) {
        (Ordering::Equal, _) => compare_at(candidate, current, tie_break) == Ordering::Less,
        (Ordering::Greater, OrderDirection::Desc) | (Ordering::Less, OrderDirection::Asc) => true,
        _ => false,
    }
}

fn directed(ordering: Ordering, direction: OrderDirection) -> Ordering {
    match direction {
        OrderDirection::Asc => ordering,
        OrderDirection::Desc => ordering.reverse(),
    }
}

fn compare_at(left: &Row, right: &Row, column: &ColumnHandle) -> Ordering {
    canonical_cmp(
        left.value_or_null(column.slot()),
        right.value_or_null(column.slot()),
    )
}
