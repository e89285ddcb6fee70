use crate::{
    db::{
        engine::QueryError,
        filter::{FilterPayload, build_caller_predicate, retain_whitelisted},
        plan::{PipelineMode, QueryPlan, StageName},
        policy::PolicySet,
        predicate::{Predicate, ResolvedPredicate},
    },
    error::InternalError,
    identity::Identity,
    model::entity::EntityDescriptor,
};

///
/// StagePredicates
/// The three narrowing predicates, always in role → source → caller order.
///

pub(super) struct StagePredicates {
    role: ResolvedPredicate,
    source: ResolvedPredicate,
    caller: ResolvedPredicate,
}

impl StagePredicates {
    fn ordered(self) -> [(StageName, ResolvedPredicate); 3] {
        [
            (StageName::Role, self.role),
            (StageName::Source, self.source),
            (StageName::Caller, self.caller),
        ]
    }
}

/// Resolve the role, source, and caller predicates against the entity.
///
/// A failing role rule or a policy predicate naming a column the entity does
/// not have is an invariant violation; it never degrades to "no restriction".
pub(super) fn resolve_stages(
    entity: &dyn EntityDescriptor,
    policies: &PolicySet,
    payload: &FilterPayload,
    identity: &Identity,
) -> Result<StagePredicates, QueryError> {
    let role = policies.roles.resolve(entity, identity).map_err(|err| {
        InternalError::policy_invariant(format!(
            "role policy '{}' failed for '{}': {err}",
            identity.role,
            entity.entity_name()
        ))
    })?;
    let role = resolve_policy(entity, &role, "role")?;

    let source = policies.sources.resolve(payload.source);
    let source = resolve_policy(entity, &source, "source")?;

    let and = retain_whitelisted(entity, &payload.and);
    let or = retain_whitelisted(entity, &payload.or);
    let caller = build_caller_predicate(&and, &or);
    // whitelisted fields were checked for resolvability above
    let caller = ResolvedPredicate::resolve(&caller, entity)
        .map_err(|err| InternalError::plan_invariant(format!("caller predicate: {err}")))?;

    Ok(StagePredicates {
        role,
        source,
        caller,
    })
}

fn resolve_policy(
    entity: &dyn EntityDescriptor,
    predicate: &Predicate,
    kind: &str,
) -> Result<ResolvedPredicate, InternalError> {
    ResolvedPredicate::resolve(predicate, entity)
        .map_err(|err| InternalError::policy_invariant(format!("{kind} policy: {err}")))
}

/// Layer the stage predicates over `base`.
///
/// Flat mode folds all three into one filter; staged mode adds one named
/// filter per stage, each narrowing the previous view. A deny-all stage is
/// kept in either mode.
pub(super) fn assemble(base: QueryPlan, stages: StagePredicates, mode: PipelineMode) -> QueryPlan {
    let plan = base.with_mode(mode);

    match mode {
        PipelineMode::Flat => {
            let predicate =
                ResolvedPredicate::conjoin(stages.ordered().into_iter().map(|(_, pred)| pred));
            if predicate.is_true() {
                plan
            } else {
                plan.push_filter(predicate, None)
            }
        }
        PipelineMode::Staged => stages
            .ordered()
            .into_iter()
            .fold(plan, |plan, (stage, predicate)| {
                plan.push_filter(predicate, Some(stage))
            }),
    }
}
