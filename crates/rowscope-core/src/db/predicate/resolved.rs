use crate::{
    db::predicate::{CompareOp, ComparePredicate, Predicate},
    model::entity::{ColumnHandle, EntityDescriptor},
    value::Value,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// ResolvedPredicate
///
/// Column-resolved predicate carried by plans.
/// Field names are resolved once during planning; evaluation is slot-only.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResolvedPredicate {
    True,
    False,
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare {
        column: ColumnHandle,
        op: CompareOp,
        value: Value,
    },
    Between {
        column: ColumnHandle,
        lower: Value,
        upper: Value,
    },
    IsNull {
        column: ColumnHandle,
    },
    IsNotNull {
        column: ColumnHandle,
    },
}

///
/// UnresolvedField
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("entity '{entity}' has no column '{field}'")]
pub struct UnresolvedField {
    pub entity: String,
    pub field: String,
}

impl ResolvedPredicate {
    /// Resolve every field reference in `predicate` against `entity`.
    pub fn resolve(
        predicate: &Predicate,
        entity: &dyn EntityDescriptor,
    ) -> Result<Self, UnresolvedField> {
        let column = |field: &str| {
            entity.resolve_column(field).ok_or_else(|| UnresolvedField {
                entity: entity.entity_name().to_string(),
                field: field.to_string(),
            })
        };

        let resolved = match predicate {
            Predicate::True => Self::True,
            Predicate::False => Self::False,
            Predicate::And(children) => Self::And(
                children
                    .iter()
                    .map(|child| Self::resolve(child, entity))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Predicate::Or(children) => Self::Or(
                children
                    .iter()
                    .map(|child| Self::resolve(child, entity))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Predicate::Not(inner) => Self::Not(Box::new(Self::resolve(inner, entity)?)),
            Predicate::Compare(ComparePredicate { field, op, value }) => Self::Compare {
                column: column(field)?,
                op: *op,
                value: value.clone(),
            },
            Predicate::Between {
                field,
                lower,
                upper,
            } => Self::Between {
                column: column(field)?,
                lower: lower.clone(),
                upper: upper.clone(),
            },
            Predicate::IsNull { field } => Self::IsNull {
                column: column(field)?,
            },
            Predicate::IsNotNull { field } => Self::IsNotNull {
                column: column(field)?,
            },
        };

        Ok(resolved)
    }

    /// Conjoin predicates, folding constants.
    ///
    /// `TRUE` operands are dropped and any `FALSE` operand collapses the
    /// result to `FALSE`; a deny-all is never folded away.
    #[must_use]
    pub fn conjoin(parts: impl IntoIterator<Item = Self>) -> Self {
        let mut kept = Vec::new();
        for part in parts {
            match part {
                Self::True => {}
                Self::False => return Self::False,
                other => kept.push(other),
            }
        }

        match kept.len() {
            0 => Self::True,
            1 => kept.remove(0),
            _ => Self::And(kept),
        }
    }

    #[must_use]
    pub const fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }

    const fn is_compound(&self) -> bool {
        matches!(self, Self::And(children) | Self::Or(children) if children.len() > 1)
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_compound() {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    fn fmt_joined(
        children: &[Self],
        sep: &str,
        empty: &str,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if children.is_empty() {
            return f.write_str(empty);
        }

        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            child.fmt_child(f)?;
        }

        Ok(())
    }
}

// SQL-like rendering used by plan explain output; child order is preserved.
impl fmt::Display for ResolvedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => f.write_str("TRUE"),
            Self::False => f.write_str("FALSE"),
            Self::And(children) => Self::fmt_joined(children, " AND ", "TRUE", f),
            Self::Or(children) => Self::fmt_joined(children, " OR ", "FALSE", f),
            Self::Not(inner) => {
                f.write_str("NOT ")?;
                inner.fmt_child(f)
            }
            Self::Compare { column, op, value } => write!(f, "{} {op} {value}", column.name()),
            Self::Between {
                column,
                lower,
                upper,
            } => write!(f, "{} BETWEEN {lower} AND {upper}", column.name()),
            Self::IsNull { column } => write!(f, "{} IS NULL", column.name()),
            Self::IsNotNull { column } => write!(f, "{} IS NOT NULL", column.name()),
        }
    }
}
