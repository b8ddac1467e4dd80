//! User activity events and their sources

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Tab visibility reported by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Input event reported by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActivityEvent {
    PointerDown,
    PointerMove,
    KeyDown,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
    FocusIn,
    VisibilityChange { state: Visibility },
}

impl ActivityEvent {
    /// Whether this event counts as the user being present.
    ///
    /// A visibility change only counts when the tab becomes visible.
    pub fn is_qualifying(&self) -> bool {
        !matches!(self, ActivityEvent::VisibilityChange { state: Visibility::Hidden })
    }
}

/// Callback invoked for every event an [`ActivitySource`] emits
pub type ActivityCallback = Arc<dyn Fn(ActivityEvent) + Send + Sync + 'static>;

/// Anything that can report user activity to a monitor
pub trait ActivitySource: Send + Sync {
    /// Register `callback`; it stays registered until the subscription is dropped
    fn on_activity(&self, callback: ActivityCallback) -> ActivitySubscription;
}

/// Registration with an [`ActivitySource`]; dropping it removes the callback
#[must_use = "dropping an ActivitySubscription removes the callback"]
pub struct ActivitySubscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl ActivitySubscription {
    pub fn new<F>(unsubscribe: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Remove the callback from its source
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for ActivitySubscription {
    fn drop(&mut self) {
        self.release();
    }
}

type CallbackMap = Mutex<BTreeMap<u64, ActivityCallback>>;

/// In-process activity source fed by [`emit`](ActivityHub::emit).
///
/// The hub remembers the last reported visibility and drops visibility
/// events that do not change it, so only real hidden-to-visible transitions
/// reach subscribers as activity.
pub struct ActivityHub {
    callbacks: Arc<CallbackMap>,
    next_id: AtomicU64,
    visibility: Mutex<Visibility>,
}

impl ActivityHub {
    /// Create a hub for a tab that starts out visible
    pub fn new() -> Self {
        Self {
            callbacks: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: AtomicU64::new(0),
            visibility: Mutex::new(Visibility::Visible),
        }
    }

    /// Deliver an event to every registered callback.
    ///
    /// Returns false when the event was a repeated visibility state and was
    /// dropped.
    pub fn emit(&self, event: ActivityEvent) -> bool {
        if let ActivityEvent::VisibilityChange { state } = event {
            let mut current = self.visibility.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == state {
                trace!("Ignoring visibility event without a transition: {:?}", state);
                return false;
            }
            *current = state;
        }

        // Callbacks run without the map locked so they may unsubscribe
        let callbacks: Vec<ActivityCallback> =
            lock_map(&self.callbacks).values().cloned().collect();
        trace!("Dispatching {:?} to {} callbacks", event, callbacks.len());
        for callback in callbacks {
            callback(event);
        }
        true
    }

    /// Number of callbacks currently registered
    pub fn subscriber_count(&self) -> usize {
        lock_map(&self.callbacks).len()
    }
}

impl Default for ActivityHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivitySource for ActivityHub {
    fn on_activity(&self, callback: ActivityCallback) -> ActivitySubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock_map(&self.callbacks).insert(id, callback);
        debug!("Activity callback {} registered", id);

        let callbacks: Weak<CallbackMap> = Arc::downgrade(&self.callbacks);
        ActivitySubscription::new(move || {
            if let Some(callbacks) = callbacks.upgrade() {
                lock_map(&callbacks).remove(&id);
                debug!("Activity callback {} removed", id);
            }
        })
    }
}

fn lock_map(map: &CallbackMap) -> MutexGuard<'_, BTreeMap<u64, ActivityCallback>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}
