use crate::{
    db::{
        filter::OrderDirection,
        plan::{PipelineMode, PlanError, PlanNode, QueryPlan, StageName},
        predicate::{Predicate, ResolvedPredicate},
    },
    model::entity::EntityDescriptor,
    test_fixtures::{VOICE, float},
};

fn resolved(predicate: &Predicate) -> ResolvedPredicate {
    ResolvedPredicate::resolve(predicate, &VOICE).expect("resolvable predicate")
}

fn column(name: &str) -> crate::model::entity::ColumnHandle {
    VOICE.resolve_column(name).expect("voice column")
}

fn staged_plan() -> QueryPlan {
    QueryPlan::scan(&VOICE)
        .with_mode(PipelineMode::Staged)
        .push_filter(
            resolved(&Predicate::eq("user_id", 99)),
            Some(StageName::Role),
        )
        .push_filter(ResolvedPredicate::True, Some(StageName::Source))
        .push_filter(
            resolved(&Predicate::gt("probability", float(0.5))),
            Some(StageName::Caller),
        )
}

#[test]
fn staged_plan_explains_as_view_chain() {
    let plan = staged_plan();

    assert_eq!(
        plan.explain(),
        "WITH role_scope AS (SELECT * FROM voices WHERE user_id = 99),\n\
         source_scope AS (SELECT * FROM role_scope WHERE TRUE),\n\
         caller_scope AS (SELECT * FROM source_scope WHERE probability > 0.5)\n\
         SELECT * FROM caller_scope"
    );
    assert_eq!(
        plan.stages(),
        vec![StageName::Role, StageName::Source, StageName::Caller]
    );
}

#[test]
fn unstaged_filters_merge_into_one_where() {
    let plan = QueryPlan::scan(&VOICE)
        .filter(&VOICE, &Predicate::eq("status", "NEW"))
        .expect("base filter")
        .filter(&VOICE, &Predicate::is_null("user_id"))
        .expect("second filter");

    assert_eq!(
        plan.explain(),
        "SELECT * FROM voices WHERE status = 'NEW' AND user_id IS NULL"
    );
    assert!(plan.is_filtered_scan());
    assert!(plan.stages().is_empty());
}

#[test]
fn filter_on_unknown_field_is_a_plan_error() {
    let err = QueryPlan::scan(&VOICE)
        .filter(&VOICE, &Predicate::eq("nope", 1))
        .expect_err("unknown field");

    assert!(matches!(err, PlanError::UnresolvedField(_)));
}

#[test]
fn dedup_sort_and_page_nest_as_subqueries() {
    let plan = QueryPlan::scan(&VOICE)
        .wrap(|input| PlanNode::Distinct {
            input,
            key: column("voice_id"),
            order: column("probability"),
            direction: OrderDirection::Desc,
            tie_break: column("id"),
        })
        .wrap(|input| PlanNode::Sort {
            input,
            column: column("probability"),
            direction: OrderDirection::Asc,
            tie_break: column("id"),
        })
        .paginate(Some(10), 20)
        .expect("page");

    assert_eq!(
        plan.explain(),
        "SELECT * FROM (SELECT * FROM (SELECT DISTINCT ON (voice_id) * FROM voices \
         ORDER BY voice_id ASC, probability DESC NULLS LAST, id ASC) AS q1 \
         ORDER BY probability ASC NULLS FIRST, id ASC) AS q2 LIMIT 10 OFFSET 20"
    );
    assert!(plan.has_distinct());
    assert!(!plan.is_filtered_scan());
}

#[test]
fn count_strips_page_and_sort_but_keeps_dedup() {
    let plan = staged_plan()
        .wrap(|input| PlanNode::Distinct {
            input,
            key: column("voice_id"),
            order: column("probability"),
            direction: OrderDirection::Desc,
            tie_break: column("id"),
        })
        .wrap(|input| PlanNode::Sort {
            input,
            column: column("id"),
            direction: OrderDirection::Desc,
            tie_break: column("id"),
        })
        .paginate(Some(5), 0)
        .expect("page");

    let count = plan.count();
    let PlanNode::Count { input } = count.root() else {
        panic!("expected count root");
    };

    assert!(matches!(**input, PlanNode::Distinct { .. }));
    assert_eq!(count.stages(), plan.stages());
    assert_eq!(count.count(), count);
}

#[test]
fn count_plans_cannot_be_paginated_or_filtered() {
    let count = QueryPlan::scan(&VOICE).count();

    assert!(matches!(
        count.clone().paginate(Some(1), 0),
        Err(PlanError::CountProjection { .. })
    ));
    assert!(matches!(
        count.filter(&VOICE, &Predicate::True),
        Err(PlanError::CountProjection { .. })
    ));
}

#[test]
fn repaginating_replaces_the_previous_page() {
    let plan = QueryPlan::scan(&VOICE)
        .paginate(Some(10), 0)
        .and_then(|plan| plan.paginate(Some(5), 5))
        .expect("page");

    assert_eq!(plan.explain(), "SELECT * FROM voices LIMIT 5 OFFSET 5");
}

#[test]
fn fingerprint_is_stable_and_sensitive_to_shape() {
    let staged = staged_plan();
    let same = staged_plan();
    let flat = staged_plan().with_mode(PipelineMode::Flat);

    assert_eq!(staged.fingerprint(), same.fingerprint());
    assert_ne!(staged.fingerprint(), flat.fingerprint());
    assert_ne!(staged.fingerprint(), staged.count().fingerprint());
    assert_eq!(staged.fingerprint().as_hex().len(), 64);
}
