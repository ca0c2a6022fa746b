//! Ternary arithmetic builtins: `OP(X, Y, Z)` holds when `X op Y = Z`
//!
//! Operands are promoted along integer → decimal → float → double. Integer
//! arithmetic is checked; overflow and division by zero are errors so the
//! evaluator can apply its configured policy.

use super::{constant_of, Builtin, BuiltinError, BuiltinOutcome};
use crate::ast::Term;
use crate::value::{DataType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
}

impl ArithmeticOp {
    pub fn name(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "ADD",
            ArithmeticOp::Subtract => "SUBTRACT",
            ArithmeticOp::Multiply => "MULTIPLY",
            ArithmeticOp::Divide => "DIVIDE",
            ArithmeticOp::Modulus => "MODULUS",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArithmeticBuiltin {
    op: ArithmeticOp,
}

impl ArithmeticBuiltin {
    pub fn new(op: ArithmeticOp) -> Self {
        ArithmeticBuiltin { op }
    }

    fn divide_by_zero(&self) -> BuiltinError {
        BuiltinError::DivideByZero {
            builtin: self.op.name().to_string(),
        }
    }

    fn overflow(&self) -> BuiltinError {
        BuiltinError::Overflow {
            builtin: self.op.name().to_string(),
        }
    }

    /// `a op b`; `Ok(None)` when the operands are not numeric
    fn apply(&self, op: ArithmeticOp, a: &Value, b: &Value) -> Result<Option<Value>, BuiltinError> {
        let (ta, tb) = (a.datatype(), b.datatype());
        let (Some(ra), Some(rb)) = (ta.numeric_rank(), tb.numeric_rank()) else {
            return Ok(None);
        };
        let target = if ra >= rb { ta } else { tb };
        if target == DataType::Integer {
            let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) else {
                return Ok(None);
            };
            let result = match op {
                ArithmeticOp::Add => x.checked_add(y),
                ArithmeticOp::Subtract => x.checked_sub(y),
                ArithmeticOp::Multiply => x.checked_mul(y),
                ArithmeticOp::Divide | ArithmeticOp::Modulus if y == 0 => {
                    return Err(self.divide_by_zero())
                }
                ArithmeticOp::Divide => x.checked_div(y),
                ArithmeticOp::Modulus => x.checked_rem(y),
            };
            return result.map(|v| Some(Value::Integer(v))).ok_or_else(|| self.overflow());
        }

        let (Some(x), Some(y)) = (a.numeric(), b.numeric()) else {
            return Ok(None);
        };
        let (x, y) = (x.as_f64(), y.as_f64());
        if matches!(op, ArithmeticOp::Divide | ArithmeticOp::Modulus) && y == 0.0 {
            return Err(self.divide_by_zero());
        }
        let result = match op {
            ArithmeticOp::Add => x + y,
            ArithmeticOp::Subtract => x - y,
            ArithmeticOp::Multiply => x * y,
            ArithmeticOp::Divide => x / y,
            ArithmeticOp::Modulus => x % y,
        };
        Ok(Some(match target {
            DataType::Decimal => Value::Decimal(result),
            DataType::Float => Value::Float(result as f32),
            _ => Value::Double(result),
        }))
    }

    /// Solve `X * y = z` for X; `None` when no exact solution exists
    fn exact_factor(&self, z: &Value, y: &Value) -> Result<Option<Value>, BuiltinError> {
        let is_zero = y.numeric().is_some_and(|n| n.as_f64() == 0.0);
        if is_zero {
            return Ok(None);
        }
        if let (Some(zi), Some(yi)) = (z.as_i64(), y.as_i64()) {
            if zi.checked_rem(yi) != Some(0) {
                return Ok(None);
            }
        }
        self.apply(ArithmeticOp::Divide, z, y)
    }
}

impl Builtin for ArithmeticBuiltin {
    fn name(&self) -> &str {
        self.op.name()
    }

    fn arity(&self) -> usize {
        3
    }

    fn can_evaluate(&self, bound: &[bool]) -> bool {
        if bound.len() != 3 {
            return false;
        }
        match self.op {
            ArithmeticOp::Add | ArithmeticOp::Subtract | ArithmeticOp::Multiply => {
                bound.iter().filter(|b| **b).count() >= 2
            }
            ArithmeticOp::Divide | ArithmeticOp::Modulus => bound[0] && bound[1],
        }
    }

    fn evaluate(&self, args: &[Option<&Term>]) -> Result<BuiltinOutcome, BuiltinError> {
        let (x, y, z) = (args[0], args[1], args[2]);
        // Ground but non-constant arguments (constructed terms) never satisfy arithmetic
        let non_numeric = args
            .iter()
            .flatten()
            .any(|t| t.as_constant().is_none_or(|v| !v.is_numeric()));
        if non_numeric {
            return Ok(BuiltinOutcome::Reject);
        }
        let (cx, cy, cz) = (constant_of(x), constant_of(y), constant_of(z));

        let completed = match (cx, cy, cz) {
            (Some(a), Some(b), expected) => {
                let Some(result) = self.apply(self.op, a, b)? else {
                    return Ok(BuiltinOutcome::Reject);
                };
                match expected {
                    Some(c) if *c == result => return Ok(BuiltinOutcome::Accept),
                    Some(_) => return Ok(BuiltinOutcome::Reject),
                    None => [a.clone(), b.clone(), result],
                }
            }
            (None, Some(b), Some(c)) => {
                let solved = match self.op {
                    ArithmeticOp::Add => self.apply(ArithmeticOp::Subtract, c, b)?,
                    ArithmeticOp::Subtract => self.apply(ArithmeticOp::Add, c, b)?,
                    ArithmeticOp::Multiply => self.exact_factor(c, b)?,
                    _ => return Err(self.insufficient()),
                };
                match solved {
                    Some(a) => [a, b.clone(), c.clone()],
                    None => return Ok(BuiltinOutcome::Reject),
                }
            }
            (Some(a), None, Some(c)) => {
                let solved = match self.op {
                    ArithmeticOp::Add => self.apply(ArithmeticOp::Subtract, c, a)?,
                    ArithmeticOp::Subtract => self.apply(ArithmeticOp::Subtract, a, c)?,
                    ArithmeticOp::Multiply => self.exact_factor(c, a)?,
                    _ => return Err(self.insufficient()),
                };
                match solved {
                    Some(b) => [a.clone(), b, c.clone()],
                    None => return Ok(BuiltinOutcome::Reject),
                }
            }
            _ => return Err(self.insufficient()),
        };
        Ok(BuiltinOutcome::Complete(
            completed.into_iter().map(Term::Constant).collect(),
        ))
    }
}

impl ArithmeticBuiltin {
    fn insufficient(&self) -> BuiltinError {
        BuiltinError::InsufficientBindings {
            builtin: self.op.name().to_string(),
            arity: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::constant;

    fn eval(op: ArithmeticOp, args: [Option<Term>; 3]) -> Result<BuiltinOutcome, BuiltinError> {
        let refs: Vec<Option<&Term>> = args.iter().map(Option::as_ref).collect();
        ArithmeticBuiltin::new(op).evaluate(&refs)
    }

    #[test]
    fn test_add_computes_each_position() {
        let out = eval(ArithmeticOp::Add, [Some(constant(1)), Some(constant(2)), None]);
        assert_eq!(
            out,
            Ok(BuiltinOutcome::Complete(vec![constant(1), constant(2), constant(3)]))
        );
        let out = eval(ArithmeticOp::Add, [None, Some(constant(2)), Some(constant(3))]);
        assert_eq!(
            out,
            Ok(BuiltinOutcome::Complete(vec![constant(1), constant(2), constant(3)]))
        );
        let out = eval(ArithmeticOp::Add, [Some(constant(1)), None, Some(constant(3))]);
        assert_eq!(
            out,
            Ok(BuiltinOutcome::Complete(vec![constant(1), constant(2), constant(3)]))
        );
    }

    #[test]
    fn test_subtract_inverse() {
        // 10 - Y = 4  =>  Y = 6
        let out = eval(ArithmeticOp::Subtract, [Some(constant(10)), None, Some(constant(4))]);
        assert_eq!(
            out,
            Ok(BuiltinOutcome::Complete(vec![constant(10), constant(6), constant(4)]))
        );
    }

    #[test]
    fn test_validation_cross_type() {
        let out = eval(
            ArithmeticOp::Add,
            [Some(constant(1)), Some(constant(2.0)), Some(constant(3))],
        );
        assert_eq!(out, Ok(BuiltinOutcome::Accept));
        let out = eval(
            ArithmeticOp::Add,
            [Some(constant(1)), Some(constant(2)), Some(constant(4))],
        );
        assert_eq!(out, Ok(BuiltinOutcome::Reject));
    }

    #[test]
    fn test_promotion_to_widest_type() {
        let out = eval(ArithmeticOp::Multiply, [Some(constant(2)), Some(constant(1.5f32)), None]);
        assert_eq!(
            out,
            Ok(BuiltinOutcome::Complete(vec![
                constant(2),
                constant(1.5f32),
                Term::Constant(Value::Float(3.0)),
            ]))
        );
        let out = eval(
            ArithmeticOp::Add,
            [Some(Term::Constant(Value::Decimal(1.5))), Some(constant(1)), None],
        );
        match out {
            Ok(BuiltinOutcome::Complete(terms)) => {
                assert_eq!(terms[2].as_constant().map(Value::datatype), Some(DataType::Decimal));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_divide_by_zero_is_error() {
        let out = eval(ArithmeticOp::Divide, [Some(constant(1)), Some(constant(0)), None]);
        assert!(matches!(out, Err(BuiltinError::DivideByZero { .. })));
        let out = eval(ArithmeticOp::Modulus, [Some(constant(1.0)), Some(constant(0.0)), None]);
        assert!(matches!(out, Err(BuiltinError::DivideByZero { .. })));
    }

    #[test]
    fn test_integer_overflow_is_error() {
        let out = eval(ArithmeticOp::Add, [Some(constant(i64::MAX)), Some(constant(1)), None]);
        assert!(matches!(out, Err(BuiltinError::Overflow { .. })));
    }

    #[test]
    fn test_multiply_inverse_requires_exact_factor() {
        let out = eval(ArithmeticOp::Multiply, [None, Some(constant(4)), Some(constant(12))]);
        assert_eq!(
            out,
            Ok(BuiltinOutcome::Complete(vec![constant(3), constant(4), constant(12)]))
        );
        let out = eval(ArithmeticOp::Multiply, [None, Some(constant(5)), Some(constant(12))]);
        assert_eq!(out, Ok(BuiltinOutcome::Reject));
        let out = eval(ArithmeticOp::Multiply, [None, Some(constant(0)), Some(constant(0))]);
        assert_eq!(out, Ok(BuiltinOutcome::Reject));
    }

    #[test]
    fn test_non_numeric_rejects() {
        let out = eval(ArithmeticOp::Add, [Some(constant("a")), Some(constant(1)), None]);
        assert_eq!(out, Ok(BuiltinOutcome::Reject));
    }

    #[test]
    fn test_binding_patterns() {
        let add = ArithmeticBuiltin::new(ArithmeticOp::Add);
        assert!(add.can_evaluate(&[true, false, true]));
        assert!(!add.can_evaluate(&[false, false, true]));
        let div = ArithmeticBuiltin::new(ArithmeticOp::Divide);
        assert!(div.can_evaluate(&[true, true, false]));
        assert!(!div.can_evaluate(&[false, true, true]));
    }
}
