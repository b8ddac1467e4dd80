//! State management module
//!
//! This module contains the monitor's internal state, the notification and
//! status types it exposes, and the shared state of the HTTP service.

pub mod app_state;
pub mod monitor_state;
pub mod warning_state;

// Re-export main types
pub use app_state::AppState;
pub use monitor_state::{CycleTimers, MonitorState};
pub use warning_state::{MonitorStatus, WarningNotice};
