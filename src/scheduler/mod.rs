//! Timer scheduling module
//!
//! The monitor never sleeps or spawns on its own. It asks a [`Scheduler`] for
//! one-shot and repeating timers, which lets the same logic run on tokio in
//! production and on a hand-driven clock in tests.

pub mod manual;
pub mod tokio_scheduler;

use std::time::{Duration, Instant};

// Re-export main types
pub use manual::ManualScheduler;
pub use tokio_scheduler::TokioScheduler;

/// One-shot timer callback
pub type OnceTask = Box<dyn FnOnce() + Send + 'static>;
/// Repeating timer callback
pub type RepeatTask = Box<dyn FnMut() + Send + 'static>;

/// Source of time and timers
pub trait Scheduler: Send + Sync {
    /// Current instant on this scheduler's clock
    fn now(&self) -> Instant;

    /// Run `task` once after `delay`
    fn after(&self, delay: Duration, task: OnceTask) -> TimerHandle;

    /// Run `task` every `period`, first firing one period from now
    fn every(&self, period: Duration, task: RepeatTask) -> TimerHandle;
}

/// Handle to a pending timer.
///
/// Cancelling or dropping the handle prevents any further firing.
#[must_use = "dropping a TimerHandle cancels the timer"]
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TimerHandle {
    /// Wrap the scheduler-specific cancellation routine
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancel the timer
    pub fn cancel(mut self) {
        self.cancel_in_place();
    }

    fn cancel_in_place(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel_in_place();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}
