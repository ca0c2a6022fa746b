//! Equality and ordering builtins

use super::{constant_of, Builtin, BuiltinError, BuiltinOutcome};
use crate::ast::Term;
use std::cmp::Ordering;

/// `EQUAL(X, Y)`: binds either side from the other
#[derive(Debug, Clone, Copy)]
pub struct EqualBuiltin;

impl Builtin for EqualBuiltin {
    fn name(&self) -> &str {
        "EQUAL"
    }

    fn arity(&self) -> usize {
        2
    }

    fn can_evaluate(&self, bound: &[bool]) -> bool {
        bound.len() == 2 && (bound[0] || bound[1])
    }

    fn evaluate(&self, args: &[Option<&Term>]) -> Result<BuiltinOutcome, BuiltinError> {
        Ok(match (args[0], args[1]) {
            (Some(a), Some(b)) if a == b => BuiltinOutcome::Accept,
            (Some(_), Some(_)) => BuiltinOutcome::Reject,
            (Some(t), None) | (None, Some(t)) => {
                BuiltinOutcome::Complete(vec![t.clone(), t.clone()])
            }
            (None, None) => {
                return Err(BuiltinError::InsufficientBindings {
                    builtin: "EQUAL".to_string(),
                    arity: 2,
                })
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Unequal,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl ComparisonOp {
    pub fn name(self) -> &'static str {
        match self {
            ComparisonOp::Unequal => "UNEQUAL",
            ComparisonOp::Less => "LESS",
            ComparisonOp::LessEqual => "LESS_EQUAL",
            ComparisonOp::Greater => "GREATER",
            ComparisonOp::GreaterEqual => "GREATER_EQUAL",
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Unequal => ordering != Ordering::Equal,
            ComparisonOp::Less => ordering == Ordering::Less,
            ComparisonOp::LessEqual => ordering != Ordering::Greater,
            ComparisonOp::Greater => ordering == Ordering::Greater,
            ComparisonOp::GreaterEqual => ordering != Ordering::Less,
        }
    }
}

/// Binary comparison; validation only
#[derive(Debug, Clone, Copy)]
pub struct ComparisonBuiltin {
    op: ComparisonOp,
}

impl ComparisonBuiltin {
    pub fn new(op: ComparisonOp) -> Self {
        ComparisonBuiltin { op }
    }
}

impl Builtin for ComparisonBuiltin {
    fn name(&self) -> &str {
        self.op.name()
    }

    fn arity(&self) -> usize {
        2
    }

    fn evaluate(&self, args: &[Option<&Term>]) -> Result<BuiltinOutcome, BuiltinError> {
        let (Some(a), Some(b)) = (args[0], args[1]) else {
            return Err(BuiltinError::InsufficientBindings {
                builtin: self.op.name().to_string(),
                arity: 2,
            });
        };
        // Terms that are not both constants only support (in)equality
        let ordering = match (constant_of(Some(a)), constant_of(Some(b))) {
            (Some(x), Some(y)) => x.compare(y),
            _ if self.op == ComparisonOp::Unequal => Some(if a == b {
                Ordering::Equal
            } else {
                Ordering::Less
            }),
            _ => None,
        };
        let holds = match ordering {
            Some(o) => self.op.holds(o),
            // Incompatible datatypes are never equal
            None => self.op == ComparisonOp::Unequal,
        };
        Ok(if holds {
            BuiltinOutcome::Accept
        } else {
            BuiltinOutcome::Reject
        })
    }
}
