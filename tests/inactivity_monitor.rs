use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::anyhow;
use session_sentinel::{
    ActivityEvent, ActivityHub, InactivityMonitor, ManualScheduler, MonitorConfig, Subscription,
    TerminationReason, WarningNotice,
};

struct Fixture {
    clock: Arc<ManualScheduler>,
    hub: Arc<ActivityHub>,
    monitor: InactivityMonitor,
    logouts: Arc<Mutex<Vec<Duration>>>,
    notices: Arc<Mutex<Vec<(Duration, WarningNotice)>>>,
    _notice_subscription: Subscription,
}

impl Fixture {
    fn new(timeout_secs: u64, lead_secs: u64) -> Self {
        let clock = Arc::new(ManualScheduler::new());
        let hub = Arc::new(ActivityHub::new());
        let logouts = Arc::new(Mutex::new(Vec::new()));

        let (logout_clock, logout_log) = (Arc::clone(&clock), Arc::clone(&logouts));
        let config =
            MonitorConfig::new(Duration::from_secs(timeout_secs), Duration::from_secs(lead_secs))
                .unwrap();
        let monitor = InactivityMonitor::new(
            config,
            clock.clone(),
            hub.clone(),
            Arc::new(move |reason: TerminationReason| {
                assert_eq!(reason, TerminationReason::Inactivity);
                logout_log.lock().unwrap().push(logout_clock.elapsed());
            }),
        );

        let notices = Arc::new(Mutex::new(Vec::new()));
        let (notice_clock, notice_log) = (Arc::clone(&clock), Arc::clone(&notices));
        let notice_subscription = monitor.subscribe(move |notice| {
            notice_log.lock().unwrap().push((notice_clock.elapsed(), *notice));
            Ok(())
        });

        Self {
            clock,
            hub,
            monitor,
            logouts,
            notices,
            _notice_subscription: notice_subscription,
        }
    }

    fn advance_secs(&self, secs: u64) {
        self.clock.advance(Duration::from_secs(secs));
    }

    fn advance_to(&self, secs: u64) {
        let target = Duration::from_secs(secs);
        let now = self.clock.elapsed();
        assert!(target >= now, "cannot move the clock backwards");
        self.clock.advance(target - now);
    }

    fn logout_times(&self) -> Vec<Duration> {
        self.logouts.lock().unwrap().clone()
    }

    fn notices(&self) -> Vec<(Duration, WarningNotice)> {
        self.notices.lock().unwrap().clone()
    }

    fn first_countdown_at(&self) -> Option<Duration> {
        self.notices()
            .into_iter()
            .find(|(_, notice)| notice.is_active())
            .map(|(at, _)| at)
    }
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

#[test]
fn start_twice_arms_one_cycle() {
    let f = Fixture::new(30 * 60, 5 * 60);
    f.monitor.start();
    f.monitor.start();

    assert_eq!(f.clock.pending_timers(), 2);
    assert_eq!(f.hub.subscriber_count(), 1);

    f.advance_secs(30 * 60 + 1);
    assert_eq!(f.logout_times(), vec![secs(30 * 60)]);

    let countdown_starts = f
        .notices()
        .iter()
        .filter(|(_, notice)| notice.remaining_seconds() == Some(300))
        .count();
    assert_eq!(countdown_starts, 1);
}

#[test]
fn stop_twice_or_before_start_is_harmless() {
    let f = Fixture::new(30, 10);
    f.monitor.stop();
    assert!(f.notices().is_empty());

    f.monitor.start();
    f.monitor.stop();
    f.monitor.stop();

    f.advance_secs(120);
    assert!(f.logout_times().is_empty());
    assert_eq!(f.clock.pending_timers(), 0);
    assert_eq!(f.hub.subscriber_count(), 0);
    assert_eq!(f.notices(), vec![(secs(0), WarningNotice::Ended)]);
}

#[test]
fn activity_pushes_back_warning_and_expiry() {
    let f = Fixture::new(30 * 60, 5 * 60);
    f.monitor.start();

    f.advance_to(20 * 60);
    f.hub.emit(ActivityEvent::PointerMove);

    f.advance_to(45 * 60 - 1);
    assert!(f.notices().is_empty(), "warning must not fire at the original 25 minute mark");
    assert!(f.logout_times().is_empty());

    f.advance_to(45 * 60);
    assert_eq!(f.first_countdown_at(), Some(secs(45 * 60)));

    f.advance_to(50 * 60 - 1);
    assert!(f.logout_times().is_empty(), "session must outlive the original 30 minute deadline");

    f.advance_to(50 * 60);
    assert_eq!(f.logout_times(), vec![secs(50 * 60)]);
}

#[test]
fn warning_counts_down_then_session_expires_once() {
    let f = Fixture::new(30 * 60, 5 * 60);
    f.monitor.start();

    f.advance_to(25 * 60 - 1);
    assert!(f.notices().is_empty());

    f.advance_to(30 * 60 - 1);
    assert!(f.logout_times().is_empty());

    let countdown: Vec<(Duration, u64)> = f
        .notices()
        .into_iter()
        .filter_map(|(at, notice)| notice.remaining_seconds().map(|remaining| (at, remaining)))
        .collect();
    assert_eq!(countdown.first(), Some(&(secs(25 * 60), 300)));
    for pair in countdown.windows(2) {
        assert_eq!(pair[1].0 - pair[0].0, secs(1));
        assert_eq!(pair[0].1 - pair[1].1, 1);
    }
    assert_eq!(countdown.last(), Some(&(secs(30 * 60 - 1), 1)));

    f.advance_to(30 * 60);
    assert_eq!(f.logout_times(), vec![secs(30 * 60)]);

    f.advance_to(2 * 60 * 60);
    assert_eq!(f.logout_times().len(), 1);
}

#[test]
fn stay_logged_in_dismisses_warning_and_restarts() {
    let f = Fixture::new(30, 10);
    f.monitor.start();
    f.advance_to(24);
    assert_eq!(f.notices().last(), Some(&(secs(24), WarningNotice::countdown(6))));

    f.monitor.stay_logged_in();
    let seen = f.notices().len();
    assert_eq!(f.notices().last(), Some(&(secs(24), WarningNotice::Ended)));

    // No stale tick after the dismissal, before the next warning at 44s
    f.advance_to(43);
    assert_eq!(f.notices().len(), seen);
    assert!(!f.monitor.status().warning_shown);

    f.advance_to(53);
    assert!(f.logout_times().is_empty());

    f.advance_to(54);
    assert_eq!(f.logout_times(), vec![secs(54)]);
}

#[test]
fn stop_during_countdown_leaves_nothing_behind() {
    let f = Fixture::new(30, 10);
    f.monitor.start();
    f.advance_to(23);

    f.monitor.stop();
    let seen = f.notices();
    assert_eq!(seen.last(), Some(&(secs(23), WarningNotice::Ended)));

    f.advance_to(300);
    assert_eq!(f.notices(), seen);
    assert!(f.logout_times().is_empty());
    assert_eq!(f.clock.pending_timers(), 0);
    assert_eq!(f.hub.subscriber_count(), 0);
}

#[test]
fn failing_subscriber_does_not_starve_others() {
    let f = Fixture::new(30, 10);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let _ = f.monitor.subscribe(|_| Err(anyhow!("dialog unmounted")));
    let _ = f.monitor.subscribe(|_| panic!("debug overlay bug"));
    let _ = f.monitor.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    f.monitor.start();
    f.advance_to(20);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.notices(), vec![(secs(20), WarningNotice::countdown(10))]);
}

#[test]
fn unsubscribed_listener_stops_receiving() {
    let f = Fixture::new(30, 10);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let subscription = f.monitor.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    f.monitor.start();
    f.advance_to(20);
    subscription.unsubscribe();
    f.advance_to(25);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn scaled_down_session_scenario() {
    let f = Fixture::new(30, 10);
    f.monitor.start();
    f.advance_to(40);

    let mut expected: Vec<(Duration, WarningNotice)> = (0..10)
        .map(|i| (secs(20 + i), WarningNotice::countdown(10 - i)))
        .collect();
    expected.push((secs(30), WarningNotice::Ended));

    assert_eq!(f.notices(), expected);
    assert_eq!(f.logout_times(), vec![secs(30)]);
    assert!(!f.monitor.is_monitoring());
}

#[test]
fn manual_reset_during_warning_closes_it() {
    let f = Fixture::new(30, 10);
    f.monitor.start();
    f.advance_to(21);

    f.monitor.reset_manually();
    assert_eq!(f.notices().last(), Some(&(secs(21), WarningNotice::Ended)));

    f.advance_to(50);
    assert!(f.logout_times().is_empty());
    f.advance_to(51);
    assert_eq!(f.logout_times(), vec![secs(51)]);
}

#[test]
fn activity_is_ignored_when_not_monitoring() {
    let f = Fixture::new(30, 10);
    f.monitor.on_activity(ActivityEvent::KeyDown);
    f.monitor.reset_manually();

    assert_eq!(f.clock.pending_timers(), 0);
    assert!(!f.monitor.is_monitoring());
    assert!(f.notices().is_empty());
}

#[test]
fn monitors_are_independent() {
    let first = Fixture::new(30, 10);
    let second = Fixture::new(60, 10);
    first.monitor.start();
    second.monitor.start();

    first.advance_to(30);
    second.advance_to(30);

    assert_eq!(first.logout_times(), vec![secs(30)]);
    assert!(second.logout_times().is_empty());
    assert!(second.monitor.is_monitoring());
}

#[test]
fn restart_after_expiry_runs_fresh_cycle() {
    let f = Fixture::new(30, 10);
    f.monitor.start();
    f.advance_to(30);
    assert_eq!(f.logout_times().len(), 1);

    f.monitor.start();
    f.advance_to(60);
    assert_eq!(f.logout_times(), vec![secs(30), secs(60)]);
}
