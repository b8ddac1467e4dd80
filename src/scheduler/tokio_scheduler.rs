//! Tokio-backed scheduler

use std::time::{Duration, Instant};
use tokio::{
    runtime::Handle,
    time::{interval_at, sleep, MissedTickBehavior},
};

use super::{OnceTask, RepeatTask, Scheduler, TimerHandle};
use crate::error::MonitorError;

/// Scheduler that runs each timer as a task on a tokio runtime.
///
/// Cancelling a timer aborts its task. A callback that is already running
/// finishes; the monitor discards stale callbacks by cycle generation.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Create a scheduler that spawns onto the given runtime
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Create a scheduler bound to the runtime of the calling context
    pub fn current() -> Result<Self, MonitorError> {
        Ok(Self::new(Handle::try_current()?))
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        // tokio's clock honours a paused runtime
        tokio::time::Instant::now().into_std()
    }

    fn after(&self, delay: Duration, task: OnceTask) -> TimerHandle {
        let join = self.handle.spawn(async move {
            sleep(delay).await;
            task();
        });
        TimerHandle::new(move || join.abort())
    }

    fn every(&self, period: Duration, mut task: RepeatTask) -> TimerHandle {
        let join = self.handle.spawn(async move {
            let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                task();
            }
        });
        TimerHandle::new(move || join.abort())
    }
}
