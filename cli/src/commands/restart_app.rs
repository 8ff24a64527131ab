//! `gamehost restart-app`: push config and mods, then restart the services.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::provisioning::DeployIntent;
use crate::domain::ProvisioningState;

/// Run `gamehost restart-app`.
///
/// The cache is never uploaded here; the copy on the server is newer.
///
/// # Errors
///
/// Returns an error if nothing is deployed or the restart fails.
pub async fn run(app: &AppContext, state: &mut ProvisioningState) -> Result<()> {
    app.check_local_layout()?;

    let reporter = app.reporter();
    app.workflow(&reporter)
        .redeploy_app(state, DeployIntent::Restart)
        .await
}
