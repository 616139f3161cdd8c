//! Cooperative cancellation.
//!
//! The transport hands a [`CancelToken`] into every engine call. The
//! interpreter checks it at each token consumption and each DFA
//! transition; a cancelled request fails as a whole, partial reports are
//! never returned.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag. Cloning is cheap and all clones observe the
/// same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
