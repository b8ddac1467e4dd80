//! Inactivity monitor
//!
//! One countdown cycle runs while monitoring. Each cycle arms a warning timer
//! at `timeout - lead` and an expiry timer at `timeout`. When the warning
//! fires a one-second tick counts the visible countdown down; the session is
//! ended by the expiry timer alone.
//!
//! Every cycle has a generation number. Restarting a cycle bumps it after
//! cancelling the old timers, so a callback that was already in flight sees a
//! stale generation and does nothing. Notifications are queued under the
//! state lock and delivered afterwards, in order, so listeners always observe
//! state changes in the order they happened and may call back into the
//! monitor.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::{
    activity::{ActivityEvent, ActivitySource},
    listeners::{ListenerRegistry, Subscription},
};
use crate::{
    config::{ceil_secs, MonitorConfig},
    scheduler::Scheduler,
    session::{SessionTerminator, TerminationReason},
    state::{MonitorState, MonitorStatus, WarningNotice},
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

struct MonitorCore {
    config: MonitorConfig,
    scheduler: Arc<dyn Scheduler>,
    activity: Arc<dyn ActivitySource>,
    terminator: Arc<dyn SessionTerminator>,
    listeners: ListenerRegistry,
    state: Mutex<MonitorState>,
}

/// Watches for user activity and ends the session after a period without any.
///
/// Cloning yields another handle to the same monitor.
#[derive(Clone)]
pub struct InactivityMonitor {
    core: Arc<MonitorCore>,
}

impl InactivityMonitor {
    /// Create an idle monitor; call [`start`](Self::start) to begin tracking
    pub fn new(
        config: MonitorConfig,
        scheduler: Arc<dyn Scheduler>,
        activity: Arc<dyn ActivitySource>,
        terminator: Arc<dyn SessionTerminator>,
    ) -> Self {
        Self {
            core: Arc::new(MonitorCore {
                config,
                scheduler,
                activity,
                terminator,
                listeners: ListenerRegistry::new(),
                state: Mutex::new(MonitorState::new()),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.core.config
    }

    /// Begin listening for activity and arm the first cycle.
    ///
    /// Calling this while already monitoring does nothing.
    pub fn start(&self) {
        let weak = Arc::downgrade(&self.core);
        let subscription = self
            .core
            .activity
            .on_activity(Arc::new(move |event: ActivityEvent| {
                if let Some(core) = weak.upgrade() {
                    core.on_activity(event);
                }
            }));

        let mut state = self.core.lock();
        if state.is_monitoring {
            drop(state);
            drop(subscription);
            debug!("Inactivity monitor already running, ignoring start");
            return;
        }

        state.is_monitoring = true;
        state.activity = Some(subscription);
        self.core.restart_cycle(&mut state);
        drop(state);

        info!(
            "Inactivity monitor started: timeout={:?}, warning lead={:?}",
            self.core.config.inactivity_timeout(),
            self.core.config.warning_lead_time()
        );
    }

    /// Cancel all timers, stop listening for activity and close any warning.
    ///
    /// Calling this while not monitoring does nothing.
    pub fn stop(&self) {
        let mut state = self.core.lock();
        if !state.is_monitoring {
            debug!("Inactivity monitor not running, ignoring stop");
            return;
        }

        let subscription = state.teardown();
        state.outbox.push_back(WarningNotice::Ended);
        drop(state);

        drop(subscription);
        self.core.flush();
        info!("Inactivity monitor stopped");
    }

    /// Handle an input event from the activity source
    pub fn on_activity(&self, event: ActivityEvent) {
        self.core.on_activity(event);
    }

    /// Extend the session without a raw input event, e.g. after an API request
    pub fn reset_manually(&self) {
        self.core.reset("manual reset");
    }

    /// Dismiss the warning and start a fresh cycle.
    ///
    /// Always emits [`WarningNotice::Ended`], after the countdown tick has
    /// been cancelled.
    pub fn stay_logged_in(&self) {
        let mut state = self.core.lock();
        if state.is_monitoring {
            self.core.restart_cycle(&mut state);
        } else {
            debug!("Stay-logged-in while not monitoring, only closing the warning");
            state.warning_shown = false;
        }
        state.outbox.push_back(WarningNotice::Ended);
        drop(state);

        self.core.flush();
        info!("User chose to stay logged in");
    }

    /// Register a listener for warning notifications
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&WarningNotice) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.core.listeners.subscribe(listener)
    }

    /// Snapshot of the current state
    pub fn status(&self) -> MonitorStatus {
        let now = self.core.scheduler.now();
        let state = self.core.lock();

        MonitorStatus {
            monitoring: state.is_monitoring,
            warning_shown: state.warning_shown,
            remaining_seconds: (state.warning_shown && state.timers.tick.is_some())
                .then_some(state.remaining_seconds),
            expires_in_seconds: state
                .expires_at
                .map(|expires_at| ceil_secs(expires_at.saturating_duration_since(now))),
            last_reset_at: state.last_reset_wall,
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.core.lock().is_monitoring
    }

    /// Stop monitoring and drop every listener
    pub fn dispose(&self) {
        self.stop();
        self.core.listeners.clear();
        debug!("Inactivity monitor disposed");
    }
}

impl MonitorCore {
    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_activity(self: &Arc<Self>, event: ActivityEvent) {
        if !event.is_qualifying() {
            return;
        }
        self.reset(&format!("{:?}", event));
    }

    /// Restart the cycle if monitoring; closes a visible warning
    fn reset(self: &Arc<Self>, cause: &str) {
        let mut state = self.lock();
        if !state.is_monitoring {
            return;
        }

        // A countdown that already ran out has emitted its Ended
        let was_warning = state.warning_shown && state.timers.tick.is_some();
        self.restart_cycle(&mut state);
        if was_warning {
            state.outbox.push_back(WarningNotice::Ended);
        }
        drop(state);

        if was_warning {
            info!("Activity during warning ({}), session extended", cause);
        } else {
            debug!("Inactivity timer reset by {}", cause);
        }
        self.flush();
    }

    /// Cancel the current cycle's timers and arm a new cycle from now
    fn restart_cycle(self: &Arc<Self>, state: &mut MonitorState) {
        state.timers.cancel_all();
        state.warning_shown = false;
        state.remaining_seconds = 0;
        state.generation += 1;

        let now = self.scheduler.now();
        state.last_reset_wall = Some(Utc::now());
        state.expires_at = now.checked_add(self.config.inactivity_timeout());
        if state.expires_at.is_none() {
            warn!("Expiry deadline is beyond the clock's range, countdown will not track it");
        }

        let generation = state.generation;
        let weak = Arc::downgrade(self);
        state.timers.warning = Some(self.scheduler.after(
            self.config.warning_delay(),
            Box::new(move || with_core(&weak, |core| core.on_warning(generation))),
        ));

        let weak = Arc::downgrade(self);
        state.timers.expiry = Some(self.scheduler.after(
            self.config.inactivity_timeout(),
            Box::new(move || with_core(&weak, |core| core.on_expiry(generation))),
        ));
    }

    fn on_warning(self: &Arc<Self>, generation: u64) {
        let mut state = self.lock();
        if !state.is_monitoring || state.generation != generation || state.warning_shown {
            return;
        }

        let remaining = self.config.warning_lead_secs();
        state.warning_shown = true;
        state.remaining_seconds = remaining;

        let weak = Arc::downgrade(self);
        state.timers.tick = Some(self.scheduler.every(
            TICK_PERIOD,
            Box::new(move || with_core(&weak, |core| core.on_tick(generation))),
        ));
        state.outbox.push_back(WarningNotice::countdown(remaining));
        drop(state);

        warn!("Session will expire in {}s due to inactivity", remaining);
        self.flush();
    }

    fn on_tick(self: &Arc<Self>, generation: u64) {
        let now = self.scheduler.now();
        let mut state = self.lock();
        if !state.is_monitoring || state.generation != generation || !state.warning_shown {
            return;
        }

        // Follow the expiry deadline so a late tick cannot drift from it
        let until_expiry = state
            .expires_at
            .map(|expires_at| ceil_secs(expires_at.saturating_duration_since(now)))
            .unwrap_or(u64::MAX);
        let remaining = until_expiry.min(state.remaining_seconds.saturating_sub(1));
        state.remaining_seconds = remaining;

        if remaining == 0 {
            if let Some(tick) = state.timers.tick.take() {
                tick.cancel();
            }
            state.outbox.push_back(WarningNotice::Ended);
            debug!("Warning countdown finished");
        } else {
            state.outbox.push_back(WarningNotice::countdown(remaining));
            debug!("Warning countdown: {}s left", remaining);
        }
        drop(state);

        self.flush();
    }

    fn on_expiry(self: &Arc<Self>, generation: u64) {
        let mut state = self.lock();
        if !state.is_monitoring || state.generation != generation {
            return;
        }

        let subscription = state.teardown();
        state.outbox.push_back(WarningNotice::Ended);
        drop(state);

        drop(subscription);
        self.flush();

        info!("Inactivity timeout reached, ending session");
        self.terminator.terminate(TerminationReason::Inactivity);
    }

    /// Deliver queued notices in order.
    ///
    /// Only one caller delivers at a time; notices queued meanwhile, including
    /// by listeners themselves, are picked up by the active flusher.
    fn flush(&self) {
        {
            let mut state = self.lock();
            if state.flushing {
                return;
            }
            state.flushing = true;
        }

        loop {
            let next = {
                let mut state = self.lock();
                let next = state.outbox.pop_front();
                if next.is_none() {
                    state.flushing = false;
                }
                next
            };

            match next {
                Some(notice) => self.listeners.notify(&notice),
                None => break,
            }
        }
    }
}

fn with_core<F>(weak: &Weak<MonitorCore>, f: F)
where
    F: FnOnce(&Arc<MonitorCore>),
{
    if let Some(core) = weak.upgrade() {
        f(&core);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        monitor::ActivityHub,
        scheduler::{ManualScheduler, OnceTask, RepeatTask, TimerHandle},
    };
    use std::{
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        time::Instant,
    };

    struct Harness {
        clock: Arc<ManualScheduler>,
        hub: Arc<ActivityHub>,
        logouts: Arc<AtomicUsize>,
        monitor: InactivityMonitor,
    }

    fn harness(timeout: u64, lead: u64) -> Harness {
        let clock = Arc::new(ManualScheduler::new());
        let hub = Arc::new(ActivityHub::new());
        let logouts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&logouts);
        let config =
            MonitorConfig::new(Duration::from_secs(timeout), Duration::from_secs(lead)).unwrap();
        let monitor = InactivityMonitor::new(
            config,
            clock.clone(),
            hub.clone(),
            Arc::new(move |_reason: TerminationReason| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        Harness { clock, hub, logouts, monitor }
    }

    #[test]
    fn start_arms_warning_and_expiry() {
        let h = harness(30, 10);
        h.monitor.start();

        assert!(h.monitor.is_monitoring());
        assert_eq!(h.clock.pending_timers(), 2);
        assert_eq!(h.hub.subscriber_count(), 1);

        let status = h.monitor.status();
        assert_eq!(status.expires_in_seconds, Some(30));
        assert!(status.last_reset_at.is_some());
    }

    #[test]
    fn hidden_tab_does_not_reset() {
        let h = harness(30, 10);
        h.monitor.start();
        h.clock.advance(Duration::from_secs(15));

        h.hub.emit(ActivityEvent::VisibilityChange {
            state: crate::monitor::Visibility::Hidden,
        });
        assert_eq!(h.monitor.status().expires_in_seconds, Some(15));

        h.hub.emit(ActivityEvent::VisibilityChange {
            state: crate::monitor::Visibility::Visible,
        });
        assert_eq!(h.monitor.status().expires_in_seconds, Some(30));
    }

    #[test]
    fn status_reports_countdown_during_warning() {
        let h = harness(30, 10);
        h.monitor.start();
        h.clock.advance(Duration::from_secs(23));

        let status = h.monitor.status();
        assert!(status.warning_shown);
        assert_eq!(status.remaining_seconds, Some(7));
        assert_eq!(status.expires_in_seconds, Some(7));
    }

    #[test]
    fn expiry_tears_down_monitoring() {
        let h = harness(30, 10);
        h.monitor.start();
        h.clock.advance(Duration::from_secs(30));

        assert_eq!(h.logouts.load(Ordering::SeqCst), 1);
        assert!(!h.monitor.is_monitoring());
        assert_eq!(h.hub.subscriber_count(), 0);
        assert_eq!(h.clock.pending_timers(), 0);
    }

    #[test]
    fn listener_may_call_back_into_monitor() {
        let h = harness(30, 10);
        let monitor = h.monitor.clone();
        let _ = h.monitor.subscribe(move |notice| {
            if notice.remaining_seconds() == Some(5) {
                monitor.stay_logged_in();
            }
            Ok(())
        });

        h.monitor.start();
        h.clock.advance(Duration::from_secs(59));
        assert_eq!(h.logouts.load(Ordering::SeqCst), 0);
        assert!(h.monitor.is_monitoring());
    }

    #[test]
    fn dispose_drops_listeners() {
        let h = harness(30, 10);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let _ = h.monitor.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        h.monitor.start();
        h.monitor.dispose();
        let after_dispose = seen.load(Ordering::SeqCst);

        h.monitor.start();
        h.clock.advance(Duration::from_secs(25));
        assert_eq!(seen.load(Ordering::SeqCst), after_dispose);
    }

    /// Manual clock whose repeating timers only run when the test fires them,
    /// so a tick can arrive arbitrarily late
    struct HeldTicks {
        clock: Arc<ManualScheduler>,
        ticks: Mutex<Vec<(Arc<AtomicBool>, RepeatTask)>>,
    }

    impl HeldTicks {
        fn fire(&self) {
            let mut ticks = std::mem::take(&mut *self.ticks.lock().unwrap());
            for (cancelled, task) in ticks.iter_mut() {
                if !cancelled.load(Ordering::SeqCst) {
                    task();
                }
            }
            ticks.retain(|(cancelled, _)| !cancelled.load(Ordering::SeqCst));
            self.ticks.lock().unwrap().extend(ticks);
        }
    }

    impl Scheduler for HeldTicks {
        fn now(&self) -> Instant {
            self.clock.now()
        }

        fn after(&self, delay: Duration, task: OnceTask) -> TimerHandle {
            self.clock.after(delay, task)
        }

        fn every(&self, _period: Duration, task: RepeatTask) -> TimerHandle {
            let cancelled = Arc::new(AtomicBool::new(false));
            self.ticks.lock().unwrap().push((Arc::clone(&cancelled), task));
            TimerHandle::new(move || cancelled.store(true, Ordering::SeqCst))
        }
    }

    struct LateHarness {
        scheduler: Arc<HeldTicks>,
        hub: Arc<ActivityHub>,
        logouts: Arc<Mutex<Vec<Duration>>>,
        notices: Arc<Mutex<Vec<WarningNotice>>>,
        monitor: InactivityMonitor,
    }

    impl LateHarness {
        fn new(timeout: u64, lead: u64) -> Self {
            let clock = Arc::new(ManualScheduler::new());
            let scheduler = Arc::new(HeldTicks {
                clock: Arc::clone(&clock),
                ticks: Mutex::new(Vec::new()),
            });
            let hub = Arc::new(ActivityHub::new());
            let logouts = Arc::new(Mutex::new(Vec::new()));
            let (logout_clock, logout_log) = (Arc::clone(&clock), Arc::clone(&logouts));
            let config = MonitorConfig::new(Duration::from_secs(timeout), Duration::from_secs(lead))
                .unwrap();
            let monitor = InactivityMonitor::new(
                config,
                scheduler.clone(),
                hub.clone(),
                Arc::new(move |_reason: TerminationReason| {
                    logout_log.lock().unwrap().push(logout_clock.elapsed());
                }),
            );

            let notices = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&notices);
            let _ = monitor.subscribe(move |notice| {
                sink.lock().unwrap().push(*notice);
                Ok(())
            });

            LateHarness { scheduler, hub, logouts, notices, monitor }
        }

        fn advance_to(&self, secs: u64) {
            let now = self.scheduler.clock.elapsed();
            self.scheduler.clock.advance(Duration::from_secs(secs) - now);
        }

        fn countdown(&self) -> Vec<u64> {
            self.notices
                .lock()
                .unwrap()
                .iter()
                .filter_map(WarningNotice::remaining_seconds)
                .collect()
        }

        fn ended_count(&self) -> usize {
            self.notices
                .lock()
                .unwrap()
                .iter()
                .filter(|notice| **notice == WarningNotice::Ended)
                .count()
        }
    }

    #[test]
    fn late_tick_catches_up_to_expiry_deadline() {
        let h = LateHarness::new(30, 10);
        h.monitor.start();
        h.advance_to(20);
        assert_eq!(h.countdown(), vec![10]);

        // Four periods pass without a tick, then one arrives late
        h.advance_to(24);
        h.scheduler.fire();
        assert_eq!(h.countdown(), vec![10, 6]);
        assert_eq!(h.monitor.status().remaining_seconds, Some(6));

        // A burst of catch-up ticks still counts down one step at a time
        h.scheduler.fire();
        h.advance_to(26);
        h.scheduler.fire();
        assert_eq!(h.countdown(), vec![10, 6, 5, 4]);

        h.advance_to(29);
        assert!(h.logouts.lock().unwrap().is_empty());

        h.advance_to(30);
        h.scheduler.fire();
        h.advance_to(60);
        assert_eq!(*h.logouts.lock().unwrap(), vec![Duration::from_secs(30)]);
        assert_eq!(h.countdown(), vec![10, 6, 5, 4]);
        assert_eq!(h.ended_count(), 1);
    }

    #[test]
    fn activity_after_countdown_ran_out_does_not_end_twice() {
        let h = LateHarness::new(30, 10);
        h.monitor.start();
        h.advance_to(29);

        // Ticks delivered in a burst run the countdown out before expiry fires
        h.scheduler.fire();
        h.scheduler.fire();
        assert_eq!(h.countdown(), vec![10, 1]);
        assert_eq!(h.ended_count(), 1);
        assert_eq!(h.monitor.status().remaining_seconds, None);

        h.hub.emit(ActivityEvent::KeyDown);
        assert_eq!(h.ended_count(), 1);
        assert_eq!(h.monitor.status().expires_in_seconds, Some(30));

        h.advance_to(58);
        assert!(h.logouts.lock().unwrap().is_empty());
        h.advance_to(59);
        assert_eq!(*h.logouts.lock().unwrap(), vec![Duration::from_secs(59)]);
    }
}
