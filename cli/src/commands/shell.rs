//! `gamehost shell`: interactive login shell on the instance.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::remote_access;
use crate::domain::ProvisioningState;

/// Run `gamehost shell`.
///
/// # Errors
///
/// Returns an error if nothing is deployed or ssh cannot be started.
pub async fn run(app: &AppContext, state: &ProvisioningState) -> Result<()> {
    let target = app.session_target(state)?;
    let status = remote_access::open_shell(&app.connector, &target).await?;
    tracing::debug!(?status, "shell exited");
    Ok(())
}
