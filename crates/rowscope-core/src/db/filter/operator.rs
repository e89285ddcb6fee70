use crate::{
    db::{
        filter::ClauseOperand,
        predicate::{CompareOp, Predicate},
    },
    value::Value,
};
use std::fmt;

///
/// OperatorArity
///
/// Shape contract for a clause value.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperatorArity {
    /// One scalar literal.
    Scalar,
    /// Non-empty list of scalars.
    List,
    /// Exactly two scalars `[lower, upper]`.
    Range,
    /// One boolean.
    Flag,
}

///
/// ClauseOperator
///
/// Closed set of operators a caller may use in a filter clause.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ClauseOperator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    IsNull,
    Between,
}

///
/// OperatorEntry
///

#[derive(Clone, Copy, Debug)]
pub struct OperatorEntry {
    pub symbol: &'static str,
    pub operator: ClauseOperator,
    pub arity: OperatorArity,
}

/// Fixed operator registry: symbol → operator + value shape contract.
pub const OPERATOR_REGISTRY: [OperatorEntry; 10] = [
    OperatorEntry {
        symbol: "=",
        operator: ClauseOperator::Eq,
        arity: OperatorArity::Scalar,
    },
    OperatorEntry {
        symbol: "!=",
        operator: ClauseOperator::Ne,
        arity: OperatorArity::Scalar,
    },
    OperatorEntry {
        symbol: "<",
        operator: ClauseOperator::Lt,
        arity: OperatorArity::Scalar,
    },
    OperatorEntry {
        symbol: "<=",
        operator: ClauseOperator::Lte,
        arity: OperatorArity::Scalar,
    },
    OperatorEntry {
        symbol: ">",
        operator: ClauseOperator::Gt,
        arity: OperatorArity::Scalar,
    },
    OperatorEntry {
        symbol: ">=",
        operator: ClauseOperator::Gte,
        arity: OperatorArity::Scalar,
    },
    OperatorEntry {
        symbol: "in",
        operator: ClauseOperator::In,
        arity: OperatorArity::List,
    },
    OperatorEntry {
        symbol: "not_in",
        operator: ClauseOperator::NotIn,
        arity: OperatorArity::List,
    },
    OperatorEntry {
        symbol: "is_null",
        operator: ClauseOperator::IsNull,
        arity: OperatorArity::Flag,
    },
    OperatorEntry {
        symbol: "between",
        operator: ClauseOperator::Between,
        arity: OperatorArity::Range,
    },
];

impl ClauseOperator {
    /// Look up an operator by its wire symbol; exact match only.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        OPERATOR_REGISTRY
            .iter()
            .find(|entry| entry.symbol == symbol)
            .map(|entry| entry.operator)
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        self.entry().symbol
    }

    #[must_use]
    pub fn arity(self) -> OperatorArity {
        self.entry().arity
    }

    fn entry(self) -> &'static OperatorEntry {
        // every variant has exactly one registry row
        let index = match self {
            Self::Eq => 0,
            Self::Ne => 1,
            Self::Lt => 2,
            Self::Lte => 3,
            Self::Gt => 4,
            Self::Gte => 5,
            Self::In => 6,
            Self::NotIn => 7,
            Self::IsNull => 8,
            Self::Between => 9,
        };

        &OPERATOR_REGISTRY[index]
    }

    // Comparison operator for scalar-arity clauses.
    const fn scalar_compare_op(self) -> Option<CompareOp> {
        match self {
            Self::Eq => Some(CompareOp::Eq),
            Self::Ne => Some(CompareOp::Ne),
            Self::Lt => Some(CompareOp::Lt),
            Self::Lte => Some(CompareOp::Lte),
            Self::Gt => Some(CompareOp::Gt),
            Self::Gte => Some(CompareOp::Gte),
            Self::In | Self::NotIn | Self::IsNull | Self::Between => None,
        }
    }

    /// Build the predicate for `field <op> operand`.
    ///
    /// The operand is assumed to satisfy this operator's arity; `FilterClause`
    /// construction guarantees it. `= NULL` and `!= NULL` compile to null
    /// tests rather than comparisons that can never match.
    #[must_use]
    pub(crate) fn build(self, field: &str, operand: &ClauseOperand) -> Predicate {
        match (self, operand) {
            (Self::Eq, ClauseOperand::Scalar(Value::Null))
            | (Self::IsNull, ClauseOperand::Flag(true)) => Predicate::is_null(field),
            (Self::Ne, ClauseOperand::Scalar(Value::Null))
            | (Self::IsNull, ClauseOperand::Flag(false)) => Predicate::is_not_null(field),

            (op, ClauseOperand::Scalar(value)) => match op.scalar_compare_op() {
                Some(cmp) => Predicate::compare(field, cmp, value.clone()),
                None => Predicate::False,
            },

            (Self::In, ClauseOperand::List(items)) => Predicate::in_(field, items.clone()),
            (Self::NotIn, ClauseOperand::List(items)) => Predicate::not_in(field, items.clone()),

            (Self::Between, ClauseOperand::Range { lower, upper }) => {
                Predicate::between(field, lower.clone(), upper.clone())
            }

            // unreachable for validated clauses; fail closed
            _ => Predicate::False,
        }
    }
}

impl fmt::Display for ClauseOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
