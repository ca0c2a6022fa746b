//! Unary datatype checks

use super::{Builtin, BuiltinError, BuiltinOutcome};
use crate::ast::Term;
use crate::value::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCheck {
    Integer,
    Numeric,
    String,
}

/// `IS_INTEGER(X)`, `IS_NUMERIC(X)`, `IS_STRING(X)`
#[derive(Debug, Clone, Copy)]
pub struct TypeCheckBuiltin {
    check: TypeCheck,
}

impl TypeCheckBuiltin {
    pub fn new(check: TypeCheck) -> Self {
        TypeCheckBuiltin { check }
    }
}

impl Builtin for TypeCheckBuiltin {
    fn name(&self) -> &str {
        match self.check {
            TypeCheck::Integer => "IS_INTEGER",
            TypeCheck::Numeric => "IS_NUMERIC",
            TypeCheck::String => "IS_STRING",
        }
    }

    fn arity(&self) -> usize {
        1
    }

    fn evaluate(&self, args: &[Option<&Term>]) -> Result<BuiltinOutcome, BuiltinError> {
        let Some(term) = args[0] else {
            return Err(BuiltinError::InsufficientBindings {
                builtin: self.name().to_string(),
                arity: 1,
            });
        };
        let datatype = term.as_constant().map(|v| v.datatype());
        let holds = match (self.check, datatype) {
            (TypeCheck::Integer, Some(DataType::Integer)) => true,
            (TypeCheck::Numeric, Some(dt)) => dt.is_numeric(),
            (TypeCheck::String, Some(DataType::String)) => true,
            _ => false,
        };
        Ok(if holds {
            BuiltinOutcome::Accept
        } else {
            BuiltinOutcome::Reject
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::constant;

    fn check(kind: TypeCheck, term: Term) -> BuiltinOutcome {
        TypeCheckBuiltin::new(kind)
            .evaluate(&[Some(&term)])
            .expect("bound")
    }

    #[test]
    fn test_type_checks() {
        assert_eq!(check(TypeCheck::Integer, constant(1)), BuiltinOutcome::Accept);
        assert_eq!(check(TypeCheck::Integer, constant(1.0)), BuiltinOutcome::Reject);
        assert_eq!(check(TypeCheck::Numeric, constant(1.0f32)), BuiltinOutcome::Accept);
        assert_eq!(check(TypeCheck::String, constant("x")), BuiltinOutcome::Accept);
        assert_eq!(
            check(TypeCheck::Numeric, Term::construct("f", vec![constant(1)])),
            BuiltinOutcome::Reject
        );
    }
}
