//! Resource Limits Module
//!
//! Bounds on how much work one evaluation may do:
//! - total derived tuples
//! - fixpoint rounds per stratum
//!
//! Checking is cooperative: evaluators call the `check_*` methods at round
//! barriers.

/// Resource limit error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("derived tuple limit exceeded: {actual} tuples, limit {limit}")]
    DerivedTuplesExceeded { limit: usize, actual: usize },

    #[error("iteration limit exceeded in stratum {stratum}: limit {limit} rounds")]
    IterationsExceeded { limit: usize, stratum: usize },
}

/// Resource limits configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum number of derived (non-input) tuples (None = unlimited)
    pub max_derived_tuples: Option<usize>,

    /// Maximum fixpoint rounds for one stratum (None = unlimited)
    pub max_iterations: Option<usize>,
}

impl ResourceLimits {
    pub fn unlimited() -> Self {
        ResourceLimits::default()
    }

    /// Build from configuration values where 0 means unlimited
    pub fn from_config(max_derived_tuples: usize, max_iterations: usize) -> Self {
        ResourceLimits {
            max_derived_tuples: (max_derived_tuples > 0).then_some(max_derived_tuples),
            max_iterations: (max_iterations > 0).then_some(max_iterations),
        }
    }

    pub fn check_derived(&self, actual: usize) -> Result<(), ResourceError> {
        match self.max_derived_tuples {
            Some(limit) if actual > limit => {
                Err(ResourceError::DerivedTuplesExceeded { limit, actual })
            }
            _ => Ok(()),
        }
    }

    /// `round` counts from 1
    pub fn check_iterations(&self, stratum: usize, round: usize) -> Result<(), ResourceError> {
        match self.max_iterations {
            Some(limit) if round > limit => Err(ResourceError::IterationsExceeded { limit, stratum }),
            _ => Ok(()),
        }
    }
}
