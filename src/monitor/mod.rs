//! Inactivity monitoring module
//!
//! This module contains the monitor itself, the activity sources that feed
//! it and the registry of warning listeners it notifies.

pub mod activity;
pub mod inactivity;
pub mod listeners;

// Re-export main types
pub use activity::{
    ActivityCallback, ActivityEvent, ActivityHub, ActivitySource, ActivitySubscription, Visibility,
};
pub use inactivity::InactivityMonitor;
pub use listeners::{ListenerRegistry, Subscription, WarningListener};
