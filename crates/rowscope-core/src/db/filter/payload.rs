use crate::db::filter::FilterClause;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error as ThisError;

///
/// OrderDirection
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    #[display("ASC")]
    Asc,
    #[display("DESC")]
    Desc,
}

///
/// SourceTag
///
/// Caller-chosen convenience bucket. Tags that do not match a known bucket
/// deserialize to `Unrecognized`, which always resolves to deny-all.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    #[display("assignment_area")]
    AssignmentArea,
    #[display("work_area")]
    WorkArea,
    #[serde(other)]
    #[display("unrecognized")]
    Unrecognized,
}

///
/// UnknownSourceTag
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("unknown source tag '{0}'")]
pub struct UnknownSourceTag(pub String);

// Strict parse used by configuration: unknown names are an error here, never
// a silent `Unrecognized`.
impl FromStr for SourceTag {
    type Err = UnknownSourceTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assignment_area" => Ok(Self::AssignmentArea),
            "work_area" => Ok(Self::WorkArea),
            _ => Err(UnknownSourceTag(s.to_string())),
        }
    }
}

///
/// FilterPayload
///
/// Per-request filter description. Read-only input to the engine; clause
/// validation already happened when the payload was built or deserialized.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct FilterPayload {
    #[serde(rename = "and_")]
    pub and: Vec<FilterClause>,
    #[serde(rename = "or_")]
    pub or: Vec<FilterClause>,
    pub source: Option<SourceTag>,
    pub order_by: Option<String>,
    pub order_direction: OrderDirection,
    pub distinct_by: Option<String>,
    pub distinct_by_order: Option<String>,
    pub distinct_by_order_direction: OrderDirection,
}

impl Default for FilterPayload {
    fn default() -> Self {
        Self {
            and: Vec::new(),
            or: Vec::new(),
            source: None,
            order_by: None,
            order_direction: OrderDirection::Asc,
            distinct_by: None,
            distinct_by_order: None,
            // dedup keeps the latest row unless told otherwise
            distinct_by_order_direction: OrderDirection::Desc,
        }
    }
}

impl FilterPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_and(mut self, clause: FilterClause) -> Self {
        self.and.push(clause);
        self
    }

    #[must_use]
    pub fn with_or(mut self, clause: FilterClause) -> Self {
        self.or.push(clause);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: SourceTag) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_order(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by = Some(field.into());
        self.order_direction = direction;
        self
    }

    #[must_use]
    pub fn with_distinct(
        mut self,
        field: impl Into<String>,
        order: impl Into<String>,
        direction: OrderDirection,
    ) -> Self {
        self.distinct_by = Some(field.into());
        self.distinct_by_order = Some(order.into());
        self.distinct_by_order_direction = direction;
        self
    }
}
