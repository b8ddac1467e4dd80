//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    session::Navigation,
    state::{MonitorStatus, WarningNotice},
};

/// API response structure for session control endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub monitor: MonitorStatus,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: &str, message: &str, monitor: MonitorStatus) -> Self {
        Self {
            status: status.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
            monitor,
        }
    }

    /// Response for an operation that left the monitor running
    pub fn monitoring(message: &str, monitor: MonitorStatus) -> Self {
        Self::new("monitoring", message, monitor)
    }

    /// Response for an operation that left the monitor stopped
    pub fn stopped(message: &str, monitor: MonitorStatus) -> Self {
        Self::new("stopped", message, monitor)
    }

    /// Pick the status label from the monitor state
    pub fn from_status(message: &str, monitor: MonitorStatus) -> Self {
        if monitor.monitoring {
            Self::monitoring(message, monitor)
        } else {
            Self::stopped(message, monitor)
        }
    }
}

/// Response to a reported activity event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityResponse {
    /// False when the event was a repeated visibility state
    pub accepted: bool,
    pub monitor: MonitorStatus,
}

/// Full status including the pending navigation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub monitor: MonitorStatus,
    pub warning: WarningNotice,
    pub navigation: Navigation,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
