//! Mutable state of one inactivity monitor

use std::{collections::VecDeque, time::Instant};
use chrono::{DateTime, Utc};

use super::WarningNotice;
use crate::{monitor::ActivitySubscription, scheduler::TimerHandle};

/// Timers belonging to the current countdown cycle
#[derive(Debug, Default)]
pub struct CycleTimers {
    pub warning: Option<TimerHandle>,
    pub expiry: Option<TimerHandle>,
    pub tick: Option<TimerHandle>,
}

impl CycleTimers {
    /// Cancel every timer, the countdown tick first
    pub fn cancel_all(&mut self) {
        if let Some(tick) = self.tick.take() {
            tick.cancel();
        }
        if let Some(warning) = self.warning.take() {
            warning.cancel();
        }
        if let Some(expiry) = self.expiry.take() {
            expiry.cancel();
        }
    }
}

/// Monitor state, only ever touched under the monitor's lock
#[derive(Default)]
pub struct MonitorState {
    pub is_monitoring: bool,
    pub warning_shown: bool,
    /// Seconds left on the visible countdown
    pub remaining_seconds: u64,
    /// Identifies the current cycle; callbacks from older cycles are ignored
    pub generation: u64,
    pub last_reset_wall: Option<DateTime<Utc>>,
    pub expires_at: Option<Instant>,
    pub timers: CycleTimers,
    pub activity: Option<ActivitySubscription>,
    /// Notices waiting to be delivered, in the order the state changed
    pub outbox: VecDeque<WarningNotice>,
    pub flushing: bool,
}

impl MonitorState {
    /// Create an idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the current cycle and return the activity subscription so the
    /// caller can release it outside the lock
    pub fn teardown(&mut self) -> Option<ActivitySubscription> {
        self.timers.cancel_all();
        self.is_monitoring = false;
        self.warning_shown = false;
        self.remaining_seconds = 0;
        self.generation += 1;
        self.expires_at = None;
        self.activity.take()
    }
}
