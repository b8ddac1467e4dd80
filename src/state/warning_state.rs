//! Warning notification payload and monitor status snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification sent to warning listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WarningNotice {
    /// Warning is visible with this many seconds left on the countdown
    Countdown { remaining_seconds: u64 },
    /// No warning is visible (dismissed, finished, or session ended)
    Ended,
}

impl WarningNotice {
    /// Create a countdown notice
    pub fn countdown(remaining_seconds: u64) -> Self {
        Self::Countdown { remaining_seconds }
    }

    /// Check if the warning is visible
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Countdown { .. })
    }

    /// Get remaining seconds if the warning is visible
    pub fn remaining_seconds(&self) -> Option<u64> {
        match self {
            Self::Countdown { remaining_seconds } => Some(*remaining_seconds),
            Self::Ended => None,
        }
    }
}

impl Default for WarningNotice {
    fn default() -> Self {
        Self::Ended
    }
}

/// Point-in-time view of a monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub monitoring: bool,
    pub warning_shown: bool,
    /// Seconds left on the visible countdown
    pub remaining_seconds: Option<u64>,
    /// Seconds until the session is ended
    pub expires_in_seconds: Option<u64>,
    pub last_reset_at: Option<DateTime<Utc>>,
}
