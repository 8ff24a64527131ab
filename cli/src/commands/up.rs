//! `gamehost up`: provision everything that is missing and deploy the app.

use anyhow::Result;

use crate::app::AppContext;
use crate::domain::ProvisioningState;

/// Run `gamehost up`.
///
/// # Errors
///
/// Returns the first failing step's error; completed steps stay recorded.
pub async fn run(app: &AppContext, state: &mut ProvisioningState) -> Result<()> {
    app.check_local_layout()?;

    let reporter = app.reporter();
    app.workflow(&reporter).bring_up(state).await?;

    if let Some(address) = state.instance.as_ref().and_then(|i| i.address.as_deref()) {
        app.output.success("Server is up.");
        app.output.kv("Address:", address);
    }
    Ok(())
}
