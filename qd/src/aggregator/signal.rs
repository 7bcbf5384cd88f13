//! Per-query completion signal
//!
//! One signal is created when a query opens and dropped when it closes, so a
//! wake-up can only ever come from the phrase the coordinator is waiting on.

use std::time::Duration;

use tokio::sync::Notify;

/// Binary, auto-resetting wake-up hint for one in-flight query
///
/// `set` wakes one waiter, or stores a single permit if nobody is waiting
/// yet; the next `wait` consumes the permit. Firing twice before anyone
/// waits still stores only one permit.
#[derive(Debug, Default)]
pub struct CompletionSignal {
    notify: Notify,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self { notify: Notify::new() }
    }

    /// Fire the signal: wake the waiting coordinator, or leave the signal
    /// set for the next wait
    pub fn set(&self) {
        self.notify.notify_one();
    }

    /// Wait until the signal fires or `budget` elapses
    ///
    /// Returns true if the signal fired, false on timeout. Consuming the
    /// permit is what resets the signal.
    pub async fn wait(&self, budget: Duration) -> bool {
        tokio::time::timeout(budget, self.notify.notified()).await.is_ok()
    }
}
