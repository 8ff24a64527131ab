//! `gamehost follow-logs`: stream the game server's log output.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::remote_access;
use crate::domain::ProvisioningState;

/// Run `gamehost follow-logs`. Returns when the stream ends or the operator
/// interrupts it.
///
/// # Errors
///
/// Returns an error if nothing is deployed or ssh cannot be started.
pub async fn run(app: &AppContext, state: &ProvisioningState) -> Result<()> {
    let target = app.session_target(state)?;
    let status =
        remote_access::follow_logs(&app.connector, &target, &app.config.app.service).await?;
    tracing::debug!(?status, "log stream ended");
    Ok(())
}
