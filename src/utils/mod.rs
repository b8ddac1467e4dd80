//! Process-level helpers used by the service binary

pub mod signals;

// Re-export main functions
pub use signals::shutdown_signal;
