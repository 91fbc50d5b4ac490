//! Cooperative cancellation.
//!
//! A single process-wide flag, set from a signal handler or UI thread and
//! polled at well-defined points inside the drill loops. Observing the flag
//! surfaces as a user-interrupt error at the drill call site.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from signal handlers.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Re-arm the flag, e.g. between keyframes.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

impl From<Arc<AtomicBool>> for CancelFlag {
    fn from(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }
}
