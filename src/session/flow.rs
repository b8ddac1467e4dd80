//! Logout-then-redirect flow run on session expiry

use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};

use super::{LogoutClient, Navigator, SessionTerminator, TerminationReason};

/// Build the login URL carrying the termination reason
pub fn login_redirect_url(login_url: &str, reason: TerminationReason) -> String {
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!("{}{}reason={}", login_url, separator, reason.query_marker())
}

/// Ends the session: toast, backend logout, then redirect to the login page.
///
/// The redirect happens whether or not the logout call succeeds.
#[derive(Clone)]
pub struct LogoutFlow {
    client: Arc<dyn LogoutClient>,
    navigator: Arc<dyn Navigator>,
    login_url: String,
    handle: Handle,
}

impl LogoutFlow {
    pub fn new(
        client: Arc<dyn LogoutClient>,
        navigator: Arc<dyn Navigator>,
        login_url: impl Into<String>,
        handle: Handle,
    ) -> Self {
        Self {
            client,
            navigator,
            login_url: login_url.into(),
            handle,
        }
    }

    /// Run the flow to completion
    pub async fn run(&self, reason: TerminationReason) {
        info!("Ending session: {:?}", reason);
        self.navigator.show_toast(reason.message());

        if let Err(e) = self.client.logout().await {
            warn!("Logout request failed, redirecting anyway: {:#}", e);
        }

        self.navigator.navigate(&login_redirect_url(&self.login_url, reason));
    }
}

impl SessionTerminator for LogoutFlow {
    fn terminate(&self, reason: TerminationReason) {
        let flow = self.clone();
        self.handle.spawn(async move {
            flow.run(reason).await;
        });
    }
}
