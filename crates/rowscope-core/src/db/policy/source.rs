use crate::{
    db::{filter::SourceTag, predicate::Predicate},
    model::status::RecordStatus,
    obs::sink::{MetricsEvent, PolicyKind, record},
    value::Value,
};
use std::collections::BTreeMap;

///
/// SourceRule
/// Implicit `field IN (values)` inclusion for one source bucket.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceRule {
    pub field: String,
    pub values: Vec<Value>,
}

impl SourceRule {
    #[must_use]
    pub fn new(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            values,
        }
    }

    fn to_predicate(&self) -> Predicate {
        Predicate::in_(self.field.clone(), self.values.clone())
    }
}

///
/// SourcePolicyTable
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SourcePolicyTable {
    rules: BTreeMap<SourceTag, SourceRule>,
}

impl SourcePolicyTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `assignment_area` is the unassigned queue, `work_area` the rows in work.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with_rule(
                SourceTag::AssignmentArea,
                SourceRule::new("status", vec![RecordStatus::New.into()]),
            )
            .with_rule(
                SourceTag::WorkArea,
                SourceRule::new("status", vec![RecordStatus::InProgress.into()]),
            )
    }

    /// Register a bucket. Rules for `SourceTag::Unrecognized` are never
    /// consulted.
    #[must_use]
    pub fn with_rule(mut self, tag: SourceTag, rule: SourceRule) -> Self {
        self.rules.insert(tag, rule);
        self
    }

    #[must_use]
    pub fn get(&self, tag: SourceTag) -> Option<&SourceRule> {
        match tag {
            SourceTag::Unrecognized => None,
            tag => self.rules.get(&tag),
        }
    }

    /// `None` means no source was requested and imposes no restriction; a
    /// present tag without a rule fails closed to `FALSE`.
    #[must_use]
    pub fn resolve(&self, tag: Option<SourceTag>) -> Predicate {
        let Some(tag) = tag else {
            return Predicate::True;
        };

        match self.get(tag) {
            Some(rule) => rule.to_predicate(),
            None => {
                tracing::warn!(source = %tag, "no source policy; denying all rows");
                record(MetricsEvent::PolicyMiss {
                    kind: PolicyKind::Source,
                });

                Predicate::False
            }
        }
    }
}
