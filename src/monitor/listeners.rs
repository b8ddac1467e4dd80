//! Warning listener registry

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};
use tracing::{debug, error, warn};

use crate::state::WarningNotice;

/// Listener for warning notifications
pub type WarningListener =
    Arc<dyn Fn(&WarningNotice) -> anyhow::Result<()> + Send + Sync + 'static>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, WarningListener)>,
}

/// Set of listeners notified in registration order.
///
/// A listener that returns an error or panics is logged and skipped; the
/// remaining listeners are still notified.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&WarningNotice) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let listener: WarningListener = Arc::new(listener);
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, listener));
        debug!("Warning listener {} subscribed", id);

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver a notice to every listener
    pub fn notify(&self, notice: &WarningNotice) {
        let listeners: Vec<(u64, WarningListener)> = self.lock().listeners.clone();

        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(notice))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Warning listener {} failed: {:#}", id, e),
                Err(_) => error!("Warning listener {} panicked", id),
            }
        }
    }

    /// Drop every listener
    pub fn clear(&self) {
        let mut registry = self.lock();
        debug!("Clearing {} warning listeners", registry.listeners.len());
        registry.listeners.clear();
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle returned by [`ListenerRegistry::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the listener; a no-op if it is already gone
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry.listeners.retain(|(id, _)| *id != self.id);
            debug!("Warning listener {} unsubscribed", self.id);
        }
    }
}
