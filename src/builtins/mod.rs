//! # Builtin Predicates
//!
//! Contract every builtin predicate implements, the registry that resolves
//! builtin names to implementations, and the standard library of arithmetic,
//! comparison and type-check builtins.
//!
//! ## Contract
//!
//! A builtin declares, for a given binding pattern (which argument positions
//! are ground), whether it can be evaluated ([`Builtin::can_evaluate`]). The
//! engine only calls [`Builtin::evaluate`] with a pattern the builtin accepted:
//!
//! - all arguments ground: the builtin validates the tuple (`Accept`/`Reject`)
//! - some arguments missing: the builtin computes the full tuple
//!   (`Complete`) or reports that no solution exists (`Reject`)
//!
//! The rule safety analyzer and SIP/adornment consult `can_evaluate` to decide
//! whether a builtin literal binds its free variables.
//!
//! ## Standard builtins
//!
//! | Name | Arity | Computes |
//! |------|-------|----------|
//! | `EQUAL` | 2 | either side from the other |
//! | `UNEQUAL`, `LESS`, `LESS_EQUAL`, `GREATER`, `GREATER_EQUAL` | 2 | validation only |
//! | `ADD`, `SUBTRACT` | 3 | any one argument from the other two |
//! | `MULTIPLY` | 3 | result, or an exact factor |
//! | `DIVIDE`, `MODULUS` | 3 | result only |
//! | `IS_INTEGER`, `IS_NUMERIC`, `IS_STRING` | 1 | validation only |

use crate::ast::{Atom, Term};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;

pub mod arithmetic;
pub mod comparison;
pub mod types;

pub use arithmetic::{ArithmeticBuiltin, ArithmeticOp};
pub use comparison::{ComparisonBuiltin, ComparisonOp, EqualBuiltin};
pub use types::{TypeCheck, TypeCheckBuiltin};

/// Errors raised by builtin evaluation or registry lookups
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuiltinError {
    #[error("division by zero in {builtin}")]
    DivideByZero { builtin: String },

    #[error("arithmetic overflow in {builtin}")]
    Overflow { builtin: String },

    #[error("{builtin}/{arity} called with too few bound arguments")]
    InsufficientBindings { builtin: String, arity: usize },

    #[error("unknown builtin {name}/{arity}")]
    Unknown { name: String, arity: usize },

    #[error("builtin {name} takes {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("builtin {name}/{arity} is already registered")]
    Duplicate { name: String, arity: usize },

    #[error("invalid builtin name '{0}'")]
    InvalidName(String),
}

/// Result of evaluating a builtin on a (partial) tuple
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinOutcome {
    /// The binding does not satisfy the builtin, or no completion exists
    Reject,
    /// Fully ground arguments satisfy the builtin
    Accept,
    /// The completed argument tuple
    Complete(Vec<Term>),
}

/// A builtin predicate
pub trait Builtin: Send + Sync + fmt::Debug {
    /// Predicate symbol, e.g. `ADD`
    fn name(&self) -> &str;

    fn arity(&self) -> usize;

    /// Whether the builtin can be evaluated when exactly the positions marked
    /// `true` are ground. Defaults to requiring every argument.
    fn can_evaluate(&self, bound: &[bool]) -> bool {
        bound.len() == self.arity() && bound.iter().all(|b| *b)
    }

    /// Evaluate with `args[i] = Some(term)` for ground positions
    fn evaluate(&self, args: &[Option<&Term>]) -> Result<BuiltinOutcome, BuiltinError>;
}

/// Shared handle to a builtin implementation
///
/// Two handles are equal when they name the same builtin with the same arity.
#[derive(Clone)]
pub struct BuiltinRef(Arc<dyn Builtin>);

impl BuiltinRef {
    pub fn new(builtin: impl Builtin + 'static) -> Self {
        BuiltinRef(Arc::new(builtin))
    }

    /// Evaluate against possibly-partial arguments, enforcing the declared
    /// binding requirements
    pub fn evaluate_checked(
        &self,
        args: &[Option<&Term>],
    ) -> Result<BuiltinOutcome, BuiltinError> {
        let mask: Vec<bool> = args.iter().map(Option::is_some).collect();
        if args.len() != self.arity() || !self.can_evaluate(&mask) {
            return Err(BuiltinError::InsufficientBindings {
                builtin: self.name().to_string(),
                arity: self.arity(),
            });
        }
        self.0.evaluate(args)
    }
}

impl Deref for BuiltinRef {
    type Target = dyn Builtin;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl fmt::Debug for BuiltinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name(), self.arity())
    }
}

impl PartialEq for BuiltinRef {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name() && self.arity() == other.arity()
    }
}

impl Eq for BuiltinRef {}

impl Hash for BuiltinRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
        self.arity().hash(state);
    }
}

/// Name and arity keyed collection of builtins
#[derive(Debug, Clone, Default)]
pub struct BuiltinRegistry {
    builtins: HashMap<(String, usize), BuiltinRef>,
}

impl BuiltinRegistry {
    /// Empty registry
    pub fn new() -> Self {
        BuiltinRegistry::default()
    }

    /// Registry holding the standard builtins
    pub fn standard() -> Self {
        let mut registry = BuiltinRegistry::new();
        let standard: Vec<BuiltinRef> = vec![
            BuiltinRef::new(EqualBuiltin),
            BuiltinRef::new(ComparisonBuiltin::new(ComparisonOp::Unequal)),
            BuiltinRef::new(ComparisonBuiltin::new(ComparisonOp::Less)),
            BuiltinRef::new(ComparisonBuiltin::new(ComparisonOp::LessEqual)),
            BuiltinRef::new(ComparisonBuiltin::new(ComparisonOp::Greater)),
            BuiltinRef::new(ComparisonBuiltin::new(ComparisonOp::GreaterEqual)),
            BuiltinRef::new(ArithmeticBuiltin::new(ArithmeticOp::Add)),
            BuiltinRef::new(ArithmeticBuiltin::new(ArithmeticOp::Subtract)),
            BuiltinRef::new(ArithmeticBuiltin::new(ArithmeticOp::Multiply)),
            BuiltinRef::new(ArithmeticBuiltin::new(ArithmeticOp::Divide)),
            BuiltinRef::new(ArithmeticBuiltin::new(ArithmeticOp::Modulus)),
            BuiltinRef::new(TypeCheckBuiltin::new(TypeCheck::Integer)),
            BuiltinRef::new(TypeCheckBuiltin::new(TypeCheck::Numeric)),
            BuiltinRef::new(TypeCheckBuiltin::new(TypeCheck::String)),
        ];
        for builtin in standard {
            let key = (builtin.name().to_string(), builtin.arity());
            registry.builtins.insert(key, builtin);
        }
        registry
    }

    /// Register a user builtin
    pub fn register(&mut self, builtin: impl Builtin + 'static) -> Result<(), BuiltinError> {
        self.register_ref(BuiltinRef::new(builtin))
    }

    pub fn register_ref(&mut self, builtin: BuiltinRef) -> Result<(), BuiltinError> {
        let name = builtin.name();
        let valid = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(BuiltinError::InvalidName(name.to_string()));
        }
        let key = (name.to_string(), builtin.arity());
        if self.builtins.contains_key(&key) {
            return Err(BuiltinError::Duplicate {
                name: key.0,
                arity: key.1,
            });
        }
        self.builtins.insert(key, builtin);
        Ok(())
    }

    pub fn get(&self, name: &str, arity: usize) -> Option<&BuiltinRef> {
        self.builtins.get(&(name.to_string(), arity))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.keys().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.builtins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builtins.is_empty()
    }

    /// Builtin atom `name(terms..)`, validating name and arity
    pub fn atom(&self, name: &str, terms: Vec<Term>) -> Result<Atom, BuiltinError> {
        if let Some(builtin) = self.get(name, terms.len()) {
            return Ok(Atom::builtin(builtin.clone(), terms));
        }
        match self.builtins.keys().find(|(n, _)| n == name) {
            Some((_, expected)) => Err(BuiltinError::ArityMismatch {
                name: name.to_string(),
                expected: *expected,
                found: terms.len(),
            }),
            None => Err(BuiltinError::Unknown {
                name: name.to_string(),
                arity: terms.len(),
            }),
        }
    }
}

/// Borrow the constant values of the bound arguments
pub(crate) fn constant_of(term: Option<&Term>) -> Option<&crate::value::Value> {
    term.and_then(Term::as_constant)
}
