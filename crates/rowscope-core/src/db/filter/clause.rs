use crate::{
    db::{
        filter::{ClauseOperator, OperatorArity},
        predicate::Predicate,
    },
    value::Value,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ClauseError
///
/// Malformed caller clause. Raised while the payload is parsed, before any
/// predicate is built; the whole request is rejected.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ClauseError {
    #[error("filter clause field name must not be empty")]
    EmptyField,

    #[error("unknown filter operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("operator '{operator}' on '{field}' expects a single scalar value")]
    ExpectedScalar {
        field: String,
        operator: ClauseOperator,
    },

    #[error("operator '{operator}' on '{field}' does not accept null")]
    NullOperand {
        field: String,
        operator: ClauseOperator,
    },

    #[error("operator '{operator}' on '{field}' expects a list value")]
    ExpectedList {
        field: String,
        operator: ClauseOperator,
    },

    #[error("operator '{operator}' on '{field}' expects a non-empty list")]
    EmptyList {
        field: String,
        operator: ClauseOperator,
    },

    #[error("operator 'between' on '{field}' expects exactly two values, got {found}")]
    BetweenArity { field: String, found: usize },

    #[error("operator 'is_null' on '{field}' expects a boolean value")]
    ExpectedBool { field: String },
}

///
/// ClauseOperand
///
/// Clause value already checked against its operator's arity contract.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClauseOperand {
    Scalar(Value),
    List(Vec<Value>),
    Range { lower: Value, upper: Value },
    Flag(bool),
}

impl ClauseOperand {
    fn parse(field: &str, operator: ClauseOperator, value: Value) -> Result<Self, ClauseError> {
        match operator.arity() {
            OperatorArity::Scalar => {
                if !value.is_scalar() {
                    return Err(ClauseError::ExpectedScalar {
                        field: field.to_string(),
                        operator,
                    });
                }
                // only equality has a null meaning (IS NULL / IS NOT NULL)
                let nullable = matches!(operator, ClauseOperator::Eq | ClauseOperator::Ne);
                if value.is_null() && !nullable {
                    return Err(ClauseError::NullOperand {
                        field: field.to_string(),
                        operator,
                    });
                }

                Ok(Self::Scalar(value))
            }

            OperatorArity::List => {
                let Value::List(items) = value else {
                    return Err(ClauseError::ExpectedList {
                        field: field.to_string(),
                        operator,
                    });
                };
                if items.is_empty() {
                    return Err(ClauseError::EmptyList {
                        field: field.to_string(),
                        operator,
                    });
                }
                if !items.iter().all(Value::is_scalar) {
                    return Err(ClauseError::ExpectedScalar {
                        field: field.to_string(),
                        operator,
                    });
                }

                Ok(Self::List(items))
            }

            OperatorArity::Range => {
                let found = match &value {
                    Value::List(items) => items.len(),
                    _ => 1,
                };
                let Value::List(items) = value else {
                    return Err(ClauseError::BetweenArity {
                        field: field.to_string(),
                        found,
                    });
                };
                let Ok([lower, upper]) = <[Value; 2]>::try_from(items) else {
                    return Err(ClauseError::BetweenArity {
                        field: field.to_string(),
                        found,
                    });
                };
                for bound in [&lower, &upper] {
                    if !bound.is_scalar() {
                        return Err(ClauseError::ExpectedScalar {
                            field: field.to_string(),
                            operator,
                        });
                    }
                    if bound.is_null() {
                        return Err(ClauseError::NullOperand {
                            field: field.to_string(),
                            operator,
                        });
                    }
                }

                Ok(Self::Range { lower, upper })
            }

            OperatorArity::Flag => value.as_bool().map(Self::Flag).ok_or_else(|| {
                ClauseError::ExpectedBool {
                    field: field.to_string(),
                }
            }),
        }
    }

    // Wire form of the operand.
    fn to_value(&self) -> Value {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::List(items) => Value::List(items.clone()),
            Self::Range { lower, upper } => Value::List(vec![lower.clone(), upper.clone()]),
            Self::Flag(flag) => Value::Bool(*flag),
        }
    }
}

///
/// FilterClause
///
/// One validated `field <operator> value` condition. Immutable once built;
/// the only constructors validate the operator and the value shape.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "ClauseWire", into = "ClauseWire")]
pub struct FilterClause {
    field: String,
    operator: ClauseOperator,
    operand: ClauseOperand,
}

impl FilterClause {
    /// Validate a clause from its wire parts (operator given as a symbol).
    pub fn new(
        field: impl Into<String>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Result<Self, ClauseError> {
        let operator =
            ClauseOperator::from_symbol(operator).ok_or_else(|| ClauseError::UnknownOperator {
                operator: operator.to_string(),
            })?;

        Self::with_operator(field, operator, value)
    }

    /// Validate a clause for an already-typed operator.
    pub fn with_operator(
        field: impl Into<String>,
        operator: ClauseOperator,
        value: impl Into<Value>,
    ) -> Result<Self, ClauseError> {
        let field = field.into();
        if field.is_empty() {
            return Err(ClauseError::EmptyField);
        }
        let operand = ClauseOperand::parse(&field, operator, value.into())?;

        Ok(Self {
            field,
            operator,
            operand,
        })
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub const fn operator(&self) -> ClauseOperator {
        self.operator
    }

    #[must_use]
    pub const fn operand(&self) -> &ClauseOperand {
        &self.operand
    }

    #[must_use]
    pub fn to_predicate(&self) -> Predicate {
        self.operator.build(&self.field, &self.operand)
    }
}

///
/// ClauseWire
/// Serialized clause shape; `op` is accepted as an alias of `operator`.
///

#[derive(Deserialize, Serialize)]
struct ClauseWire {
    field: String,
    #[serde(alias = "op")]
    operator: String,
    #[serde(default)]
    value: Value,
}

impl TryFrom<ClauseWire> for FilterClause {
    type Error = ClauseError;

    fn try_from(wire: ClauseWire) -> Result<Self, Self::Error> {
        Self::new(wire.field, &wire.operator, wire.value)
    }
}

impl From<FilterClause> for ClauseWire {
    fn from(clause: FilterClause) -> Self {
        Self {
            value: clause.operand.to_value(),
            operator: clause.operator.symbol().to_string(),
            field: clause.field,
        }
    }
}
