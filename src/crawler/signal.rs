//! Shared termination flag for cooperative worker shutdown

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Monotonic stop flag shared by the orchestrator and every worker
///
/// Once triggered it stays set. Workers poll it between pages; pacing sleeps
/// wait on it so a shutdown request cuts them short.
#[derive(Debug, Default)]
pub struct TerminationSignal {
    triggered: Mutex<bool>,
    changed: Condvar,
}

impl TerminationSignal {
    /// Creates an unset signal
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.triggered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the flag and wakes every waiter. Setting it twice is harmless.
    pub fn trigger(&self) {
        let mut triggered = self.lock();
        if !*triggered {
            *triggered = true;
            tracing::info!("Termination requested");
        }
        self.changed.notify_all();
    }

    /// Returns true once the flag has been set
    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    /// Blocks for up to `timeout`, returning early if the flag gets set
    ///
    /// # Returns
    ///
    /// `true` if the signal is set when the wait ends
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |triggered| !*triggered)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}
