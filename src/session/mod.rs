//! Session termination module
//!
//! This module contains what happens once the inactivity budget runs out:
//! the server-side logout call, the user-facing toast and the redirect to
//! the login page.

pub mod flow;
pub mod logout;
pub mod navigator;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use flow::{login_redirect_url, LogoutFlow};
pub use logout::{CommandLogout, LogoutClient, NoopLogout};
pub use navigator::{Navigation, Navigator, PendingNavigation};

/// Why a session was ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Inactivity,
}

impl TerminationReason {
    /// Marker appended to the login URL
    pub fn query_marker(&self) -> &'static str {
        match self {
            TerminationReason::Inactivity => "inactive",
        }
    }

    /// Toast shown to the user
    pub fn message(&self) -> &'static str {
        match self {
            TerminationReason::Inactivity => "You have been logged out due to inactivity",
        }
    }
}

/// Side-effect run by the monitor when the session expires.
///
/// Called synchronously from the timer that detected expiry; long-running
/// work should be handed off (see [`LogoutFlow`]).
pub trait SessionTerminator: Send + Sync {
    fn terminate(&self, reason: TerminationReason);
}

impl<F> SessionTerminator for F
where
    F: Fn(TerminationReason) + Send + Sync,
{
    fn terminate(&self, reason: TerminationReason) {
        self(reason)
    }
}
