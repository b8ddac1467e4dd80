//! Session Sentinel - An inactivity monitor that ends idle sessions
//!
//! This library tracks user activity against a timeout budget, warns with a
//! visible countdown before the budget runs out, and ends the session
//! (logout, toast, redirect to the login page) once it does.

pub mod api;
pub mod config;
pub mod error;
pub mod monitor;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::{Config, MonitorConfig};
pub use error::MonitorError;
pub use monitor::{ActivityEvent, ActivityHub, ActivitySource, InactivityMonitor, Subscription};
pub use scheduler::{ManualScheduler, Scheduler, TimerHandle, TokioScheduler};
pub use session::{SessionTerminator, TerminationReason};
pub use state::{AppState, MonitorStatus, WarningNotice};
pub use utils::signals::shutdown_signal;
