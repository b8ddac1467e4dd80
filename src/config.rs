//! Configuration and CLI argument handling

use std::time::Duration;

use clap::Parser;

use crate::error::MonitorError;

/// Default time without activity before the session is ended
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Default time before expiry at which the warning countdown appears
pub const DEFAULT_WARNING_LEAD_TIME: Duration = Duration::from_secs(5 * 60);
/// Longest inactivity timeout accepted
pub const MAX_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "session-sentinel")]
#[command(about = "An inactivity monitor that warns before session expiry and forces logout")]
#[command(version = "1.0.0")]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Seconds without activity before the session is ended
    #[arg(short, long = "timeout-secs", default_value = "1800")]
    pub timeout_secs: u64,

    /// Seconds before expiry at which the warning countdown starts
    #[arg(short, long = "warning-lead-secs", default_value = "300")]
    pub warning_lead_secs: u64,

    /// Login page the client is sent to once the session expires
    #[arg(long, default_value = "/login")]
    pub login_url: String,

    /// Command run to terminate the server-side session on expiry
    #[arg(long)]
    pub logout_command: Option<String>,

    /// Start monitoring immediately instead of waiting for POST /session/start
    #[arg(long)]
    pub auto_start: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Build the validated monitor timings from the CLI values
    pub fn monitor_config(&self) -> Result<MonitorConfig, MonitorError> {
        MonitorConfig::new(
            Duration::from_secs(self.timeout_secs),
            Duration::from_secs(self.warning_lead_secs),
        )
    }

    /// Split the logout command into program and arguments
    pub fn logout_command_parts(&self) -> Option<(String, Vec<String>)> {
        let command = self.logout_command.as_deref()?;
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some((program, parts.collect()))
    }
}

/// Timing budget of an inactivity monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    inactivity_timeout: Duration,
    warning_lead_time: Duration,
}

impl MonitorConfig {
    /// Validate and build a monitor configuration.
    ///
    /// The timeout must be non-zero and at most [`MAX_INACTIVITY_TIMEOUT`].
    /// The warning lead time must be non-zero and strictly shorter than the
    /// inactivity timeout so the warning always fires before expiry.
    pub fn new(
        inactivity_timeout: Duration,
        warning_lead_time: Duration,
    ) -> Result<Self, MonitorError> {
        if inactivity_timeout.is_zero() {
            return Err(MonitorError::ZeroTimeout);
        }
        if inactivity_timeout > MAX_INACTIVITY_TIMEOUT {
            return Err(MonitorError::TimeoutTooLong {
                timeout: inactivity_timeout,
                max: MAX_INACTIVITY_TIMEOUT,
            });
        }
        if warning_lead_time.is_zero() {
            return Err(MonitorError::ZeroWarningLead);
        }
        if warning_lead_time >= inactivity_timeout {
            return Err(MonitorError::WarningLeadTooLong {
                lead: warning_lead_time,
                timeout: inactivity_timeout,
            });
        }

        Ok(Self {
            inactivity_timeout,
            warning_lead_time,
        })
    }

    pub fn inactivity_timeout(&self) -> Duration {
        self.inactivity_timeout
    }

    pub fn warning_lead_time(&self) -> Duration {
        self.warning_lead_time
    }

    /// Delay from a reset until the warning appears
    pub fn warning_delay(&self) -> Duration {
        self.inactivity_timeout - self.warning_lead_time
    }

    /// Warning lead time in whole seconds, rounded up
    pub fn warning_lead_secs(&self) -> u64 {
        ceil_secs(self.warning_lead_time)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            warning_lead_time: DEFAULT_WARNING_LEAD_TIME,
        }
    }
}

/// Round a duration up to whole seconds
pub(crate) fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 { secs + 1 } else { secs }
}
