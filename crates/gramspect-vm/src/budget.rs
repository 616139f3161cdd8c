//! Per-parse wall-clock budget and cancellation.

use std::time::{Duration, Instant};

use gramspect_core::CancelToken;

use crate::error::RuntimeError;

/// Deadline plus cancellation flag, checked at every token consumption
/// and every DFA transition.
#[derive(Debug, Clone)]
pub struct Budget {
    deadline: Option<Instant>,
    timeout: Duration,
    cancel: CancelToken,
}

impl Budget {
    pub fn new(timeout: Option<Duration>, cancel: CancelToken) -> Self {
        Self {
            deadline: timeout.map(|t| Instant::now() + t),
            timeout: timeout.unwrap_or_default(),
            cancel,
        }
    }

    /// Unlimited budget with no cancellation, for tests.
    pub fn unlimited() -> Self {
        Self::new(None, CancelToken::new())
    }

    pub fn check(&self) -> Result<(), RuntimeError> {
        if self.cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                return Err(RuntimeError::ParseTimeout(self.timeout));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_trips_check() {
        let cancel = CancelToken::new();
        let budget = Budget::new(None, cancel.clone());
        assert!(budget.check().is_ok());
        cancel.cancel();
        assert!(matches!(budget.check(), Err(RuntimeError::Cancelled)));
    }

    #[test]
    fn elapsed_deadline_times_out() {
        let budget = Budget::new(Some(Duration::ZERO), CancelToken::new());
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(
            budget.check(),
            Err(RuntimeError::ParseTimeout(_))
        ));
    }
}
