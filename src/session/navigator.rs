//! Client-facing toast and redirect

use std::sync::{Mutex, PoisonError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

/// Tells the client what to show and where to go
pub trait Navigator: Send + Sync {
    fn show_toast(&self, message: &str);
    fn navigate(&self, location: &str);
}

/// Last toast and redirect issued to the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub toast: Option<String>,
    pub redirect: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
}

/// Navigator that holds the navigation until the client picks it up over
/// HTTP, and publishes it to watchers
#[derive(Debug)]
pub struct PendingNavigation {
    current: Mutex<Navigation>,
    updates: watch::Sender<Navigation>,
}

impl PendingNavigation {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(Navigation::default());
        Self {
            current: Mutex::new(Navigation::default()),
            updates,
        }
    }

    /// Current navigation
    pub fn get(&self) -> Navigation {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Forget any pending toast and redirect, e.g. when a new session starts
    pub fn clear(&self) {
        self.update(|navigation| *navigation = Navigation::default());
    }

    /// Watch navigation changes
    pub fn watch(&self) -> watch::Receiver<Navigation> {
        self.updates.subscribe()
    }

    fn update<F>(&self, updater: F)
    where
        F: FnOnce(&mut Navigation),
    {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        updater(&mut current);
        let snapshot = current.clone();
        drop(current);

        // No receivers is fine; the HTTP status endpoint reads `current`
        self.updates.send_replace(snapshot);
    }
}

impl Default for PendingNavigation {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for PendingNavigation {
    fn show_toast(&self, message: &str) {
        info!("Toast: {}", message);
        self.update(|navigation| {
            navigation.toast = Some(message.to_string());
            navigation.issued_at = Some(Utc::now());
        });
    }

    fn navigate(&self, location: &str) {
        info!("Redirecting client to {}", location);
        self.update(|navigation| {
            navigation.redirect = Some(location.to_string());
            navigation.issued_at = Some(Utc::now());
        });
    }
}
