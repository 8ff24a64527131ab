//! `gamehost console`: launch the live console web interface.

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::application::services::remote_access;
use crate::domain::config::console_access;
use crate::domain::{ProvisionError, ProvisioningState};

/// Run `gamehost console`.
///
/// Both console settings are checked before the state is consulted.
///
/// # Errors
///
/// Returns a configuration error if the console is not enabled, or an error
/// if nothing is deployed or the console program fails.
pub async fn run(app: &AppContext, state: &ProvisioningState) -> Result<()> {
    console_access(&app.config)?;

    let instance = state.instance.as_ref().ok_or(ProvisionError::NoInstance)?;
    let host = instance
        .address
        .as_deref()
        .ok_or(ProvisionError::NoAddress { id: instance.id })?;

    let scratch = tempfile::TempDir::new().context("creating console scratch directory")?;
    app.output
        .info(&format!("Starting console for {host}. Press Ctrl-C to stop."));
    let status =
        remote_access::launch_console(&app.runner, &app.config, host, scratch.path()).await?;
    anyhow::ensure!(status.success(), "console exited with {status}");
    Ok(())
}
