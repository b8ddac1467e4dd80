//! Session Sentinel - An inactivity monitor that ends idle sessions
//!
//! This is the main entry point for the session-sentinel service.

use std::sync::Arc;
use tokio::{net::TcpListener, runtime::Handle};
use tracing::info;

use session_sentinel::{
    api::create_router,
    config::Config,
    monitor::{ActivityHub, InactivityMonitor},
    scheduler::TokioScheduler,
    session::{CommandLogout, LogoutClient, LogoutFlow, NoopLogout, PendingNavigation},
    state::AppState,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("session_sentinel={},tower_http=info", config.log_level()))
        .init();

    info!("Starting session-sentinel v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, timeout={}s, warning lead={}s, login={}",
        config.host, config.port, config.timeout_secs, config.warning_lead_secs, config.login_url
    );

    let monitor_config = config.monitor_config()?;

    let logout: Arc<dyn LogoutClient> = match config.logout_command_parts() {
        Some((program, args)) => {
            info!("Logout command: {} {:?}", program, args);
            Arc::new(CommandLogout::new(program, args))
        }
        None => Arc::new(NoopLogout),
    };

    let activity = Arc::new(ActivityHub::new());
    let navigation = Arc::new(PendingNavigation::new());
    let terminator = LogoutFlow::new(
        logout,
        navigation.clone(),
        config.login_url.clone(),
        Handle::current(),
    );

    let monitor = InactivityMonitor::new(
        monitor_config,
        Arc::new(TokioScheduler::current()?),
        activity.clone(),
        Arc::new(terminator),
    );

    // Create application state
    let state = Arc::new(AppState::new(
        config.port,
        config.host.clone(),
        monitor.clone(),
        activity,
        navigation,
    ));

    if config.auto_start {
        monitor.start();
    }

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /session/start    - Begin inactivity monitoring");
    info!("  POST /session/stop     - Stop inactivity monitoring");
    info!("  POST /activity         - Report a client input event");
    info!("  POST /activity/manual  - Extend the session after an API call");
    info!("  POST /stay-logged-in   - Dismiss the expiry warning");
    info!("  GET  /status           - Monitor status and pending redirect");
    info!("  GET  /events           - Warning notices as server-sent events");
    info!("  GET  /health           - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    monitor.dispose();
    info!("Server shutdown complete");
    Ok(())
}
