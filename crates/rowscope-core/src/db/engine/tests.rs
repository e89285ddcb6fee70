
use crate::{
    db::{
        engine::{ApplyOptions, FilterEngine, QueryError},
        executor::MemoryExecutor,
        filter::{FilterClause, FilterPayload, OrderDirection, SourceTag},
        plan::{PipelineMode, PlanNode, QueryPlan, StageName},
        policy::{PolicyError, PolicySet, RolePolicyTable, SourcePolicyTable, SourceRule},
        predicate::Predicate,
    },
    error::ErrorOrigin,
    identity::{Identity, Role},
    model::row::Row,
    test_fixtures::{VOICE, float, row_id, voice_row},
    value::Value,
};

const OPERATOR: Identity = Identity::new(99, Role::Operator);
const ADMIN: Identity = Identity::new(1, Role::Admin);

fn staged() -> ApplyOptions {
    ApplyOptions::new(false, PipelineMode::Staged)
}

fn flat() -> ApplyOptions {
    ApplyOptions::new(false, PipelineMode::Flat)
}

fn clause(field: &str, op: &str, value: impl Into<Value>) -> FilterClause {
    FilterClause::new(field, op, value).expect("valid clause")
}

fn store(rows: Vec<Row>) -> MemoryExecutor {
    let executor = MemoryExecutor::new();
    executor.extend(&VOICE, rows).expect("insert rows");
    executor
}

fn ids(executor: &MemoryExecutor, plan: &QueryPlan) -> Vec<i64> {
    executor
        .execute(plan)
        .expect("execute")
        .iter()
        .map(row_id)
        .collect()
}

#[test]
fn operator_sees_unassigned_new_and_own_rows() {
    let policies = PolicySet::standard();
    let engine = FilterEngine::new(&VOICE, &policies);
    let executor = store(vec![
        voice_row(1, "a", "NEW", None, 0.1),
        voice_row(2, "b", "NEW", Some(99), 0.2),
        voice_row(3, "c", "NEW", Some(5), 0.3),
        voice_row(4, "d", "IN_PROGRESS", None, 0.4),
    ]);
    let payload = FilterPayload::new().with_and(clause("status", "=", "NEW"));

    for options in [staged(), flat()] {
        let plan = engine
            .apply(&payload, &OPERATOR, None, options)
            .expect("plan");
        assert_eq!(ids(&executor, &plan), vec![1, 2], "{}", options.mode);
    }
}

#[test]
fn operator_plan_explains_per_mode() {
    let policies = PolicySet::standard();
    let engine = FilterEngine::new(&VOICE, &policies);
    let payload = FilterPayload::new().with_and(clause("status", "=", "NEW"));

    let staged_plan = engine
        .apply(&payload, &OPERATOR, None, staged())
        .expect("staged");
    let flat_plan = engine
        .apply(&payload, &OPERATOR, None, flat())
        .expect("flat");

    assert_eq!(
        staged_plan.explain(),
        "WITH role_scope AS (SELECT * FROM voices WHERE user_id = 99 OR (user_id IS NULL AND status = 'NEW')),\n\
         source_scope AS (SELECT * FROM role_scope WHERE TRUE),\n\
         caller_scope AS (SELECT * FROM source_scope WHERE status = 'NEW')\n\
         SELECT * FROM caller_scope"
    );
    assert_eq!(
        flat_plan.explain(),
        "SELECT * FROM voices WHERE (user_id = 99 OR (user_id IS NULL AND status = 'NEW')) AND status = 'NEW'"
    );
    assert_eq!(staged_plan.stages(), StageName::ORDER.to_vec());
    assert!(flat_plan.stages().is_empty());
}

#[test]
fn dedup_returns_latest_row_per_voice() {
    let policies = PolicySet::standard();
    let engine = FilterEngine::new(&VOICE, &policies);
    let executor = store(vec![
        voice_row(1, "a", "NEW", None, 0.3),
        voice_row(2, "a", "NEW", None, 0.9),
        voice_row(3, "b", "NEW", None, 0.5),
    ]);
    let payload =
        FilterPayload::new().with_distinct("voice_id", "probability", OrderDirection::Desc);

    let plan = engine
        .apply_with_dedup(&payload, &ADMIN, None, false)
        .expect("plan");
    let rows = executor.execute(&plan).expect("rows");

    let picked: Vec<_> = rows
        .iter()
        .map(|row| (row.get(1).cloned(), row.get(5).cloned()))
        .collect();
    assert_eq!(
        picked,
        vec![
            (Some(Value::text("a")), Some(float(0.9))),
            (Some(Value::text("b")), Some(float(0.5))),
        ]
    );
    assert_eq!(plan.mode(), PipelineMode::Staged);
}

#[test]
fn dedup_falls_back_to_primary_key_and_skips_unknown_keys() {
    let policies = PolicySet::standard();
    let engine = FilterEngine::new(&VOICE, &policies);

    let payload = FilterPayload {
        distinct_by: Some("voice_id".to_string()),
        ..FilterPayload::default()
    };
    let plan = engine
        .apply_with_dedup(&payload, &ADMIN, None, false)
        .expect("plan");
    let PlanNode::Distinct { order, .. } = plan.root() else {
        panic!("expected distinct root");
    };
    assert_eq!(order.name(), "id");

    let payload = FilterPayload {
        distinct_by: Some("no_such_field".to_string()),
        ..FilterPayload::default()
    };
    let plan = engine
        .apply_with_dedup(&payload, &ADMIN, None, false)
        .expect("plan");
    assert!(!plan.has_distinct());
}

#[test]
fn unknown_role_or_source_yields_no_rows() {
    let policies = PolicySet::standard();
    let engine = FilterEngine::new(&VOICE, &policies);
    let executor = store(vec![voice_row(1, "a", "NEW", None, 0.1)]);

    let stranger = Identity::new(1, Role::Unrecognized);
    let plan = engine
        .apply(&FilterPayload::new(), &stranger, None, staged())
        .expect("plan");
    assert!(ids(&executor, &plan).is_empty());

    let payload = FilterPayload::new().with_source(SourceTag::Unrecognized);
    let plan = engine
        .apply(&payload, &ADMIN, None, flat())
        .expect("plan");
    assert!(ids(&executor, &plan).is_empty());
    assert_eq!(plan.explain(), "SELECT * FROM voices WHERE FALSE");
}

#[test]
fn source_bucket_narrows_rows() {
    let policies = PolicySet::standard();
    let engine = FilterEngine::new(&VOICE, &policies);
    let executor = store(vec![
        voice_row(1, "a", "NEW", None, 0.1),
        voice_row(2, "b", "IN_PROGRESS", Some(1), 0.2),
    ]);
    let payload = FilterPayload::new().with_source(SourceTag::WorkArea);

    let plan = engine
        .apply(&payload, &ADMIN, None, staged())
        .expect("plan");

    assert_eq!(ids(&executor, &plan), vec![2]);
}

#[test]
fn clauses_on_hidden_fields_cannot_widen_visibility() {
    let policies = PolicySet::standard();
    let engine = FilterEngine::new(&VOICE, &policies);
    let executor = store(vec![
        voice_row(1, "a", "IN_PROGRESS", Some(5), 0.1),
        voice_row(2, "b", "IN_PROGRESS", Some(99), 0.2),
    ]);
    // user_id is not caller-filterable; the OR clause is dropped
    let payload = FilterPayload::new()
        .with_or(clause("user_id", "=", 5))
        .with_or(clause("status", "=", "IN_PROGRESS"));

    let plan = engine
        .apply(&payload, &OPERATOR, None, staged())
        .expect("plan");

    assert_eq!(ids(&executor, &plan), vec![2]);
}

#[test]
fn sorting_applies_only_when_requested_and_known() {
    let policies = PolicySet::standard();
    let engine = FilterEngine::new(&VOICE, &policies);
    let executor = store(vec![
        voice_row(1, "a", "NEW", None, 0.5),
        voice_row(2, "b", "NEW", None, 0.9),
        voice_row(3, "c", "NEW", None, 0.1),
    ]);
    let payload = FilterPayload::new().with_order("probability", OrderDirection::Desc);

    let sorted = engine
        .apply(&payload, &ADMIN, None, ApplyOptions::new(true, PipelineMode::Flat))
        .expect("sorted");
    assert_eq!(ids(&executor, &sorted), vec![2, 1, 3]);

    let unsorted = engine
        .apply(&payload, &ADMIN, None, flat())
        .expect("unsorted");
    assert_eq!(ids(&executor, &unsorted), vec![1, 2, 3]);

    let unknown = FilterPayload::new().with_order("shoe_size", OrderDirection::Asc);
    let ignored = engine
        .apply(&unknown, &ADMIN, None, ApplyOptions::new(true, PipelineMode::Flat))
        .expect("ignored sort");
    assert_eq!(ignored, unsorted);
}

#[test]
fn hidden_columns_cannot_order_or_group_results() {
    let policies = PolicySet::standard();
    let engine = FilterEngine::new(&VOICE, &policies);
    let executor = store(vec![
        voice_row(1, "a", "NEW", Some(50), 0.5),
        voice_row(2, "a", "NEW", Some(3), 0.9),
        voice_row(3, "b", "NEW", Some(20), 0.1),
    ]);

    // user_id resolves but is not whitelisted
    let payload = FilterPayload::new().with_order("user_id", OrderDirection::Asc);
    let plan = engine
        .apply(&payload, &ADMIN, None, ApplyOptions::new(true, PipelineMode::Flat))
        .expect("plan");
    assert_eq!(ids(&executor, &plan), vec![1, 2, 3]);
    assert!(!plan.explain().contains("ORDER BY"), "{}", plan.explain());

    let grouped = FilterPayload {
        distinct_by: Some("user_id".to_string()),
        ..FilterPayload::default()
    };
    let plan = engine
        .apply_with_dedup(&grouped, &ADMIN, None, false)
        .expect("plan");
    assert!(!plan.has_distinct());

    let ranked = FilterPayload::new().with_distinct("voice_id", "user_id", OrderDirection::Desc);
    let plan = engine
        .apply_with_dedup(&ranked, &ADMIN, None, false)
        .expect("plan");
    let PlanNode::Distinct { order, .. } = plan.root() else {
        panic!("expected distinct root");
    };
    assert_eq!(order.name(), "id");
    assert_eq!(ids(&executor, &plan), vec![2, 3]);
}

#[test]
fn count_matches_unpaginated_fetch() {
    let policies = PolicySet::standard();
    let engine = FilterEngine::new(&VOICE, &policies);
    let executor = store(vec![
        voice_row(1, "a", "NEW", None, 0.3),
        voice_row(2, "a", "NEW", None, 0.9),
        voice_row(3, "b", "NEW", None, 0.5),
        voice_row(4, "c", "NEW", Some(7), 0.5),
    ]);
    let payload = FilterPayload::new()
        .with_distinct("voice_id", "probability", OrderDirection::Desc)
        .with_order("probability", OrderDirection::Asc);

    let plan = engine
        .apply_with_dedup(&payload, &OPERATOR, None, true)
        .expect("plan");
    let paged = plan.clone().paginate(Some(1), 0).expect("page");
    let total = executor
        .execute_count(&engine.count_of(&paged))
        .expect("count");

    assert_eq!(total, executor.execute(&plan).expect("rows").len() as u64);
    assert_eq!(total, 2);
}

#[test]
fn base_query_narrows_before_policies() {
    let policies = PolicySet::standard();
    let engine = FilterEngine::new(&VOICE, &policies);
    let executor = store(vec![
        voice_row(1, "a", "NEW", None, 0.1),
        voice_row(2, "b", "NEW", None, 0.8),
    ]);
    let base = QueryPlan::scan(&VOICE)
        .filter(&VOICE, &Predicate::gt("probability", float(0.5)))
        .expect("base");

    let plan = engine
        .apply(&FilterPayload::new(), &OPERATOR, Some(base), flat())
        .expect("plan");

    assert_eq!(ids(&executor, &plan), vec![2]);
    assert_eq!(
        plan.explain(),
        "SELECT * FROM voices WHERE probability > 0.5 AND (user_id = 99 OR (user_id IS NULL AND status = 'NEW'))"
    );
}

#[test]
fn base_query_for_another_entity_is_an_invariant_violation() {
    static OTHER: crate::model::entity::EntityModel = crate::model::entity::EntityModel {
        entity_name: "records",
        primary_key: "id",
        fields: &["id"],
        filter_whitelist: &[],
    };
    let policies = PolicySet::standard();
    let engine = FilterEngine::new(&VOICE, &policies);

    let err = engine
        .apply(
            &FilterPayload::new(),
            &ADMIN,
            Some(QueryPlan::scan(&OTHER)),
            staged(),
        )
        .expect_err("mismatch");
    let QueryError::Invariant(err) = err else {
        panic!("expected invariant, got {err:?}");
    };
    assert!(err.is_invariant_violation());
    assert_eq!(err.origin, ErrorOrigin::Plan);

    let paged = QueryPlan::scan(&VOICE).paginate(Some(1), 0).expect("page");
    let err = engine
        .apply(&FilterPayload::new(), &ADMIN, Some(paged), staged())
        .expect_err("paged base");
    assert!(matches!(err, QueryError::Invariant(_)));
}

#[test]
fn staged_plan_cannot_be_reused_as_a_base_query() {
    let policies = PolicySet::standard();
    let engine = FilterEngine::new(&VOICE, &policies);
    let first = engine
        .apply(&FilterPayload::new(), &OPERATOR, None, staged())
        .expect("first plan");
    assert!(!first.is_filtered_scan());

    let err = engine
        .apply(&FilterPayload::new(), &OPERATOR, Some(first), staged())
        .expect_err("staged base");
    let QueryError::Invariant(err) = err else {
        panic!("expected invariant, got {err:?}");
    };
    assert_eq!(err.origin, ErrorOrigin::Plan);

    // flat plans carry no view names and may be narrowed again
    let flat_base = engine
        .apply(&FilterPayload::new(), &OPERATOR, None, flat())
        .expect("flat plan");
    let second = engine
        .apply(&FilterPayload::new(), &OPERATOR, Some(flat_base), staged())
        .expect("second plan");
    assert_eq!(second.stages(), StageName::ORDER.to_vec());
}

#[test]
fn failing_role_rule_never_degrades_to_no_restriction() {
    let policies = PolicySet::new(
        RolePolicyTable::new().with_rule(Role::Admin, |_, _| {
            Err(PolicyError::Rule("directory offline".to_string()))
        }),
        SourcePolicyTable::standard(),
    );
    let engine = FilterEngine::new(&VOICE, &policies);

    let err = engine
        .apply(&FilterPayload::new(), &ADMIN, None, flat())
        .expect_err("rule failure");

    let QueryError::Invariant(err) = err else {
        panic!("expected invariant, got {err:?}");
    };
    assert_eq!(err.origin, ErrorOrigin::Policy);
    assert!(err.message.contains("directory offline"), "{}", err.message);
}

#[test]
fn source_rule_on_missing_column_is_an_invariant_violation() {
    let policies = PolicySet::new(
        RolePolicyTable::standard(),
        SourcePolicyTable::new().with_rule(
            SourceTag::WorkArea,
            SourceRule::new("region", vec![Value::text("eu")]),
        ),
    );
    let engine = FilterEngine::new(&VOICE, &policies);
    let payload = FilterPayload::new().with_source(SourceTag::WorkArea);

    let err = engine
        .apply(&payload, &ADMIN, None, staged())
        .expect_err("missing column");

    assert!(matches!(err, QueryError::Invariant(_)));
}
