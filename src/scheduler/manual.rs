//! Hand-driven clock for deterministic timing

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::{Duration, Instant},
};
use tracing::trace;

use super::{OnceTask, RepeatTask, Scheduler, TimerHandle};

enum Job {
    Once(OnceTask),
    Every { period: Duration, task: RepeatTask },
}

struct Pending {
    cancelled: Arc<AtomicBool>,
    job: Job,
}

#[derive(Default)]
struct Queue {
    elapsed: Duration,
    next_seq: u64,
    // Keyed by (due offset, insertion order) so equal deadlines fire in scheduling order
    timers: BTreeMap<(Duration, u64), Pending>,
}

impl Queue {
    fn insert(&mut self, due: Duration, pending: Pending) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.insert((due, seq), pending);
    }
}

/// Scheduler whose clock only moves when [`advance`](Self::advance) is called.
///
/// Timers fire synchronously on the calling thread, in deadline order. A
/// callback may schedule or cancel other timers; new timers that fall inside
/// the window being advanced fire within the same call.
pub struct ManualScheduler {
    origin: Instant,
    queue: Mutex<Queue>,
}

impl ManualScheduler {
    /// Create a clock at offset zero with no timers
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            queue: Mutex::new(Queue::default()),
        }
    }

    /// Time advanced since creation
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    /// Number of timers that are scheduled and not cancelled
    pub fn pending_timers(&self) -> usize {
        self.lock()
            .timers
            .values()
            .filter(|pending| !pending.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Move the clock forward, firing every timer that falls due
    pub fn advance(&self, by: Duration) {
        let target = self.lock().elapsed.saturating_add(by);

        loop {
            // The queue lock is released before each callback runs
            let next = {
                let mut queue = self.lock();
                let first = queue.timers.keys().next().copied();
                match first {
                    Some(key) if key.0 <= target => {
                        queue.elapsed = key.0;
                        queue.timers.remove(&key).map(|pending| (key.0, pending))
                    }
                    _ => None,
                }
            };

            let Some((due, pending)) = next else { break };
            if pending.cancelled.load(Ordering::SeqCst) {
                continue;
            }

            trace!("Manual clock firing timer due at {:?}", due);
            match pending.job {
                Job::Once(task) => task(),
                Job::Every { period, mut task } => {
                    task();
                    if !pending.cancelled.load(Ordering::SeqCst) {
                        self.lock().insert(
                            due.saturating_add(period),
                            Pending {
                                cancelled: pending.cancelled,
                                job: Job::Every { period, task },
                            },
                        );
                    }
                }
            }
        }

        self.lock().elapsed = target;
    }

    fn schedule(&self, delay: Duration, job: Job) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        {
            let mut queue = self.lock();
            let due = queue.elapsed.saturating_add(delay);
            queue.insert(
                due,
                Pending {
                    cancelled: Arc::clone(&cancelled),
                    job,
                },
            );
        }
        TimerHandle::new(move || cancelled.store(true, Ordering::SeqCst))
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn after(&self, delay: Duration, task: OnceTask) -> TimerHandle {
        self.schedule(delay, Job::Once(task))
    }

    fn every(&self, period: Duration, task: RepeatTask) -> TimerHandle {
        self.schedule(period, Job::Every { period, task })
    }
}
