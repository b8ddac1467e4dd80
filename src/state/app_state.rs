//! Shared state of the HTTP service

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use super::WarningNotice;
use crate::{
    monitor::{ActivityHub, InactivityMonitor, Subscription},
    session::PendingNavigation,
};

/// State handed to every HTTP handler
pub struct AppState {
    /// The monitor for this process
    pub monitor: InactivityMonitor,
    /// Activity reported by the client is fed in here
    pub activity: Arc<ActivityHub>,
    /// Toast and redirect waiting for the client
    pub navigation: Arc<PendingNavigation>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Mutex<Option<String>>,
    pub last_action_time: Mutex<Option<DateTime<Utc>>>,
    /// Latest warning notice, mirrored from the monitor
    pub notice_tx: Arc<watch::Sender<WarningNotice>>,
    /// Keep the receiver alive to prevent channel closure
    pub _notice_rx: watch::Receiver<WarningNotice>,
    _notice_subscription: Subscription,
}

impl AppState {
    /// Create the service state and start mirroring warning notices
    pub fn new(
        port: u16,
        host: String,
        monitor: InactivityMonitor,
        activity: Arc<ActivityHub>,
        navigation: Arc<PendingNavigation>,
    ) -> Self {
        let (notice_tx, notice_rx) = watch::channel(WarningNotice::Ended);
        let notice_tx = Arc::new(notice_tx);

        let tx = Arc::clone(&notice_tx);
        let notice_subscription = monitor.subscribe(move |notice| {
            tx.send_replace(*notice);
            Ok(())
        });

        Self {
            monitor,
            activity,
            navigation,
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
            notice_tx,
            _notice_rx: notice_rx,
            _notice_subscription: notice_subscription,
        }
    }

    /// Record a client action for the status endpoint
    pub fn record_action(&self, action: &str) {
        debug!("Client action: {}", action);
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    /// Subscribe to warning notices
    pub fn notices(&self) -> watch::Receiver<WarningNotice> {
        self.notice_tx.subscribe()
    }

    /// Latest warning notice
    pub fn current_notice(&self) -> WarningNotice {
        *self.notice_tx.borrow()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
