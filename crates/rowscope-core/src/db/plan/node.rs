use crate::{
    db::{
        filter::OrderDirection,
        predicate::{Predicate, ResolvedPredicate, UnresolvedField},
    },
    model::entity::{ColumnHandle, EntityDescriptor},
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// PipelineMode
///
/// Flat applies every mandatory and caller predicate in one filter; staged
/// applies them as successive narrowing views. Both return the same rows.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    #[display("flat")]
    Flat,
    #[default]
    #[display("staged")]
    Staged,
}

///
/// StageName
/// Narrowing stage of a staged pipeline, in application order.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum StageName {
    Role,
    Source,
    Caller,
}

impl StageName {
    pub const ORDER: [Self; 3] = [Self::Role, Self::Source, Self::Caller];

    /// View name used in explain output.
    #[must_use]
    pub const fn view_name(self) -> &'static str {
        match self {
            Self::Role => "role_scope",
            Self::Source => "source_scope",
            Self::Caller => "caller_scope",
        }
    }
}

///
/// PlanError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PlanError {
    #[error(transparent)]
    UnresolvedField(#[from] UnresolvedField),

    #[error("plan for '{entity}' is a count projection and cannot be {action}")]
    CountProjection { entity: String, action: &'static str },
}

///
/// PlanNode
///
/// One relational step. Every node except `Scan` wraps exactly one input.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PlanNode {
    Scan {
        entity: String,
    },
    Filter {
        input: Box<Self>,
        predicate: ResolvedPredicate,
        stage: Option<StageName>,
    },
    /// Top-1 per `key`: the row with the extreme `order` value, ties by
    /// `tie_break` ascending.
    Distinct {
        input: Box<Self>,
        key: ColumnHandle,
        order: ColumnHandle,
        direction: OrderDirection,
        tie_break: ColumnHandle,
    },
    Sort {
        input: Box<Self>,
        column: ColumnHandle,
        direction: OrderDirection,
        tie_break: ColumnHandle,
    },
    Page {
        input: Box<Self>,
        limit: Option<u32>,
        offset: u32,
    },
    Count {
        input: Box<Self>,
    },
}

impl PlanNode {
    #[must_use]
    pub fn input(&self) -> Option<&Self> {
        match self {
            Self::Scan { .. } => None,
            Self::Filter { input, .. }
            | Self::Distinct { input, .. }
            | Self::Sort { input, .. }
            | Self::Page { input, .. }
            | Self::Count { input } => Some(input),
        }
    }

    /// Iterate from this node down to the scan.
    pub fn chain(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |node| node.input())
    }
}

///
/// QueryPlan
///
/// A plan rooted at one entity scan. Plans are values: every builder method
/// consumes the plan and returns the extended one.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueryPlan {
    entity: String,
    root: PlanNode,
    mode: PipelineMode,
}

impl QueryPlan {
    /// Full scan of `entity`.
    #[must_use]
    pub fn scan(entity: &dyn EntityDescriptor) -> Self {
        let entity = entity.entity_name().to_string();

        Self {
            root: PlanNode::Scan {
                entity: entity.clone(),
            },
            entity,
            mode: PipelineMode::Flat,
        }
    }

    /// Narrow this plan by a base predicate (used for caller-supplied base
    /// queries such as "active rows only").
    pub fn filter(
        self,
        entity: &dyn EntityDescriptor,
        predicate: &Predicate,
    ) -> Result<Self, PlanError> {
        if self.is_count() {
            return Err(self.count_error("filtered"));
        }
        let resolved = ResolvedPredicate::resolve(predicate, entity)?;

        Ok(self.push_filter(resolved, None))
    }

    /// Apply a limit and offset. Any existing page is replaced.
    pub fn paginate(self, limit: Option<u32>, offset: u32) -> Result<Self, PlanError> {
        if self.is_count() {
            return Err(self.count_error("paginated"));
        }

        let Self { entity, root, mode } = self;
        let input = match root {
            PlanNode::Page { input, .. } => *input,
            other => other,
        };

        Ok(Self {
            entity,
            root: PlanNode::Page {
                input: Box::new(input),
                limit,
                offset,
            },
            mode,
        })
    }

    /// Count projection over the same filtered (and deduplicated) rows.
    ///
    /// Page and sort nodes are stripped first; counting an existing count
    /// plan returns it unchanged.
    #[must_use]
    pub fn count(&self) -> Self {
        if self.is_count() {
            return self.clone();
        }

        let mut root = self.root.clone();
        while let PlanNode::Page { input, .. } | PlanNode::Sort { input, .. } = root {
            root = *input;
        }

        Self {
            entity: self.entity.clone(),
            root: PlanNode::Count {
                input: Box::new(root),
            },
            mode: self.mode,
        }
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    #[must_use]
    pub const fn root(&self) -> &PlanNode {
        &self.root
    }

    #[must_use]
    pub const fn mode(&self) -> PipelineMode {
        self.mode
    }

    #[must_use]
    pub const fn is_count(&self) -> bool {
        matches!(self.root, PlanNode::Count { .. })
    }

    /// Whether the plan is a scan with zero or more unstaged filters, the only
    /// shape accepted as a base query. Staged filters own their view names, so
    /// a plan that already carries them cannot be staged again.
    #[must_use]
    pub fn is_filtered_scan(&self) -> bool {
        self.root.chain().all(|node| {
            matches!(
                node,
                PlanNode::Scan { .. } | PlanNode::Filter { stage: None, .. }
            )
        })
    }

    #[must_use]
    pub fn has_distinct(&self) -> bool {
        self.root
            .chain()
            .any(|node| matches!(node, PlanNode::Distinct { .. }))
    }

    /// Named stages, in application order.
    #[must_use]
    pub fn stages(&self) -> Vec<StageName> {
        let mut stages: Vec<_> = self
            .root
            .chain()
            .filter_map(|node| match node {
                PlanNode::Filter { stage, .. } => *stage,
                _ => None,
            })
            .collect();
        stages.reverse();

        stages
    }

    pub(crate) const fn with_mode(mut self, mode: PipelineMode) -> Self {
        self.mode = mode;
        self
    }

    /// Add a filter. Unstaged filters stacked directly on another unstaged
    /// filter are merged into one conjunction.
    pub(crate) fn push_filter(self, predicate: ResolvedPredicate, stage: Option<StageName>) -> Self {
        let Self { entity, root, mode } = self;

        let root = match (root, stage) {
            (
                PlanNode::Filter {
                    input,
                    predicate: existing,
                    stage: None,
                },
                None,
            ) => PlanNode::Filter {
                input,
                predicate: ResolvedPredicate::conjoin([existing, predicate]),
                stage: None,
            },
            (root, stage) => PlanNode::Filter {
                input: Box::new(root),
                predicate,
                stage,
            },
        };

        Self { entity, root, mode }
    }

    pub(crate) fn wrap(self, build: impl FnOnce(Box<PlanNode>) -> PlanNode) -> Self {
        let Self { entity, root, mode } = self;

        Self {
            entity,
            root: build(Box::new(root)),
            mode,
        }
    }

    fn count_error(&self, action: &'static str) -> PlanError {
        PlanError::CountProjection {
            entity: self.entity.clone(),
            action,
        }
    }
}
