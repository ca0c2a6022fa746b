//! Evaluation Controls
//!
//! Timeout enforcement and resource limits, checked cooperatively by the
//! evaluators at every fixpoint round barrier.

mod limits;
mod timeout;

pub use limits::{ResourceError, ResourceLimits};
pub use timeout::{CancelHandle, QueryTimeout, TimeoutError};

/// Reason an evaluation stopped before reaching its fixpoint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Interruption {
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Timeout and limits bundled for the evaluators
#[derive(Debug, Clone, Default)]
pub struct ExecutionGuard {
    pub timeout: QueryTimeout,
    pub limits: ResourceLimits,
}

impl ExecutionGuard {
    pub fn new(timeout: QueryTimeout, limits: ResourceLimits) -> Self {
        ExecutionGuard { timeout, limits }
    }

    /// Check before starting round `round` (from 1) of `stratum`
    pub fn check_round(&self, stratum: usize, round: usize) -> Result<(), Interruption> {
        self.timeout.check()?;
        self.limits.check_iterations(stratum, round)?;
        Ok(())
    }

    /// Check after merging a round
    pub fn check_derived(&self, derived: usize) -> Result<(), Interruption> {
        self.limits.check_derived(derived)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interruption_display() {
        let err = Interruption::from(ResourceError::IterationsExceeded { limit: 2, stratum: 0 });
        assert_eq!(err.to_string(), "iteration limit exceeded in stratum 0: limit 2 rounds");
    }

    #[test]
    fn test_guard_checks_cancellation_first() {
        let guard = ExecutionGuard::new(QueryTimeout::infinite(), ResourceLimits::from_config(0, 1));
        assert!(guard.check_round(0, 1).is_ok());
        assert!(matches!(guard.check_round(0, 2), Err(Interruption::Resource(_))));
        guard.timeout.cancel();
        assert!(matches!(guard.check_round(0, 1), Err(Interruption::Timeout(_))));
    }
}
