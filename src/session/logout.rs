//! Server-side logout clients

use futures::future::{BoxFuture, FutureExt};
use tokio::process::Command;
use tracing::{debug, info};

/// Terminates the session on the backend
pub trait LogoutClient: Send + Sync {
    fn logout(&self) -> BoxFuture<'_, anyhow::Result<()>>;
}

/// Logout performed by running an external command, e.g. a `curl` against
/// the session endpoint
#[derive(Debug, Clone)]
pub struct CommandLogout {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLogout {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    async fn run(&self) -> anyhow::Result<()> {
        debug!("Running logout command: {} {:?}", self.program, self.args);

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to execute {}: {}", self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} exited with {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
        }

        info!("Logout command completed");
        Ok(())
    }
}

impl LogoutClient for CommandLogout {
    fn logout(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        self.run().boxed()
    }
}

/// Logout for deployments without a backend session to close
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogout;

impl LogoutClient for NoopLogout {
    fn logout(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        debug!("No logout command configured");
        futures::future::ready(Ok(())).boxed()
    }
}
