use crate::{
    db::{policy::PolicyError, predicate::Predicate},
    identity::{Identity, Role},
    model::{entity::EntityDescriptor, status::RecordStatus},
    obs::sink::{MetricsEvent, PolicyKind, record},
};
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Predicate constructor for one role.
pub type RoleRule =
    Arc<dyn Fn(&dyn EntityDescriptor, &Identity) -> Result<Predicate, PolicyError> + Send + Sync>;

///
/// RolePolicyTable
///
/// Role → predicate constructor. Immutable once shared; `Role::Unrecognized`
/// and roles without a rule resolve to `FALSE`.
///

#[derive(Clone, Default)]
pub struct RolePolicyTable {
    rules: BTreeMap<Role, RoleRule>,
}

impl RolePolicyTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admin sees everything; operators see their own rows and the unassigned
    /// NEW queue.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with_rule(Role::Admin, allow_all)
            .with_rule(Role::Operator, operator_scope)
    }

    #[must_use]
    pub fn with_rule<F>(mut self, role: Role, rule: F) -> Self
    where
        F: Fn(&dyn EntityDescriptor, &Identity) -> Result<Predicate, PolicyError>
            + Send
            + Sync
            + 'static,
    {
        self.rules.insert(role, Arc::new(rule));
        self
    }

    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        role != Role::Unrecognized && self.rules.contains_key(&role)
    }

    /// Resolve the mandatory access predicate for `identity`.
    ///
    /// A missing rule is not an error: it yields `FALSE` so the caller sees an
    /// empty result. An `Err` means a registered rule failed.
    pub fn resolve(
        &self,
        entity: &dyn EntityDescriptor,
        identity: &Identity,
    ) -> Result<Predicate, PolicyError> {
        let rule = match identity.role {
            Role::Unrecognized => None,
            role => self.rules.get(&role),
        };

        match rule {
            Some(rule) => rule(entity, identity),
            None => {
                tracing::warn!(
                    entity = entity.entity_name(),
                    role = %identity.role,
                    "no role policy; denying all rows"
                );
                record(MetricsEvent::PolicyMiss {
                    kind: PolicyKind::Role,
                });

                Ok(Predicate::False)
            }
        }
    }
}

impl fmt::Debug for RolePolicyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RolePolicyTable")
            .field("roles", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Full visibility.
pub fn allow_all(_: &dyn EntityDescriptor, _: &Identity) -> Result<Predicate, PolicyError> {
    Ok(Predicate::True)
}

/// `user_id = <me> OR (user_id IS NULL AND status = 'NEW')`.
pub fn operator_scope(
    entity: &dyn EntityDescriptor,
    identity: &Identity,
) -> Result<Predicate, PolicyError> {
    for field in ["user_id", "status"] {
        if entity.resolve_column(field).is_none() {
            return Err(PolicyError::MissingColumn {
                entity: entity.entity_name().to_string(),
                field: field.to_string(),
            });
        }
    }

    let own = Predicate::eq("user_id", identity.id);
    let unassigned_new =
        Predicate::is_null("user_id") & Predicate::eq("status", RecordStatus::New);

    Ok(own | unassigned_new)
}
