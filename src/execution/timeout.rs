//! Cooperative cancellation for fixpoint evaluation
//!
//! Evaluators call [`QueryTimeout::check`] once per fixpoint round. A round is
//! never interrupted midway, so an aborted evaluation stops at a barrier and
//! reports [`TimeoutError`] instead of a partial relation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Evaluation stopped by a deadline or an explicit cancel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutError {
    #[error("evaluation exceeded timeout of {timeout:?} (ran for {elapsed:?})")]
    Expired { timeout: Duration, elapsed: Duration },

    #[error("evaluation cancelled after {elapsed:?}")]
    Cancelled { elapsed: Duration },
}

/// Optional deadline plus a cancellation flag shared with every
/// [`CancelHandle`] taken from it
#[derive(Debug, Clone)]
pub struct QueryTimeout {
    flag: Arc<AtomicBool>,
    started: Instant,
    deadline: Option<Duration>,
}

impl QueryTimeout {
    /// Clock starts now
    pub fn new(deadline: Option<Duration>) -> Self {
        QueryTimeout {
            flag: Arc::new(AtomicBool::new(false)),
            started: Instant::now(),
            deadline,
        }
    }

    /// Deadline in milliseconds from the `timeout_ms` setting; 0 means none
    pub fn from_millis(ms: u64) -> Self {
        QueryTimeout::new((ms > 0).then(|| Duration::from_millis(ms)))
    }

    pub fn infinite() -> Self {
        QueryTimeout::new(None)
    }

    /// Err once the flag is raised or the deadline has passed. Expiry raises
    /// the flag, so later checks keep failing.
    pub fn check(&self) -> Result<(), TimeoutError> {
        let elapsed = self.started.elapsed();
        let expired = self.deadline.filter(|limit| elapsed > *limit);
        if let Some(timeout) = expired {
            self.flag.store(true, Ordering::Relaxed);
            return Err(TimeoutError::Expired { timeout, elapsed });
        }
        if self.is_cancelled() {
            return Err(TimeoutError::Cancelled { elapsed });
        }
        Ok(())
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Handle another thread can use to stop this evaluation
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.flag),
        }
    }
}

impl Default for QueryTimeout {
    fn default() -> Self {
        QueryTimeout::infinite()
    }
}

/// Raises the cancellation flag of the [`QueryTimeout`] it came from
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
