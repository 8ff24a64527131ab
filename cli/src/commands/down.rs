//! `gamehost down`: save the cache, destroy the instance, forget the state.

use anyhow::Result;

use crate::app::AppContext;
use crate::domain::{ProvisionError, ProvisioningState};

/// Run `gamehost down`.
///
/// # Errors
///
/// Returns an error if there is no instance or teardown fails. On failure
/// the state is left untouched.
pub async fn run(app: &AppContext, state: &mut ProvisioningState) -> Result<()> {
    let instance = state.instance.as_ref().ok_or(ProvisionError::NoInstance)?;
    let prompt = format!(
        "Destroy instance {} (id {})? This cannot be undone.",
        instance.name, instance.id
    );
    if !app.non_interactive && !app.confirm(&prompt, false)? {
        app.output.info("Cancelled.");
        return Ok(());
    }

    let reporter = app.reporter();
    app.workflow(&reporter).tear_down(state).await?;

    *state = ProvisioningState::fresh();
    app.output.success("Deployment removed.");
    Ok(())
}
