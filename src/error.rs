//! Error types for monitor construction

use std::time::Duration;
use thiserror::Error;

/// Errors raised while configuring or wiring up an inactivity monitor
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("inactivity timeout must be greater than zero")]
    ZeroTimeout,

    #[error("inactivity timeout {timeout:?} exceeds the maximum of {max:?}")]
    TimeoutTooLong { timeout: Duration, max: Duration },

    #[error("warning lead time must be greater than zero")]
    ZeroWarningLead,

    #[error("warning lead time {lead:?} must be shorter than the inactivity timeout {timeout:?}")]
    WarningLeadTooLong { lead: Duration, timeout: Duration },

    #[error("no tokio runtime available to drive timers: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
