//! Crate-level error taxonomy
//!
//! Every module owns its own error type; [`Error`] composes them for the
//! [`crate::knowledge_base`] entry points.

use crate::builtins::BuiltinError;
use crate::evaluation::EvaluationError;
use crate::execution::Interruption;
use crate::recursion::NotStratifiedError;
use crate::safety::UnsafeRuleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A rule or the query is not range-restricted under the active policy
    #[error(transparent)]
    RuleUnsafe(#[from] UnsafeRuleError),

    /// Stratified evaluation was requested for a program with a negative cycle
    #[error(transparent)]
    ProgramNotStratified(#[from] NotStratifiedError),

    #[error(transparent)]
    Evaluation(EvaluationError),

    /// Evaluation stopped before its fixpoint; no result is available
    #[error("incomplete evaluation: {0}")]
    Incomplete(#[from] Interruption),

    #[error(transparent)]
    Builtin(#[from] BuiltinError),

    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),
}

impl From<EvaluationError> for Error {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::Interrupted(interruption) => Error::Incomplete(interruption),
            other => Error::Evaluation(other),
        }
    }
}

impl Error {
    /// The evaluation was aborted rather than completed
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Error::Incomplete(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ResourceError;

    #[test]
    fn test_interrupted_evaluation_becomes_incomplete() {
        let interruption = Interruption::from(ResourceError::DerivedTuplesExceeded { limit: 1, actual: 2 });
        let err = Error::from(EvaluationError::Interrupted(interruption));
        assert!(err.is_incomplete());
        assert!(err.to_string().starts_with("incomplete evaluation"));
    }

    #[test]
    fn test_runtime_errors_stay_evaluation() {
        let err = Error::from(EvaluationError::DivideByZero {
            rule: "d(Z) :- a(X), b(Y), DIVIDE(X, Y, Z).".to_string(),
        });
        assert!(matches!(err, Error::Evaluation(EvaluationError::DivideByZero { .. })));
        assert!(!err.is_incomplete());
    }
}
