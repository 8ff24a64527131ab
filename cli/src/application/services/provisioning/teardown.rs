//! Teardown: save the remote cache, then destroy the instance.

use anyhow::{Context, Result};

use super::{ProvisioningWorkflow, session_target};
use crate::application::ports::{
    CloudProvider, KeyGenerator, ProgressReporter, RemoteConnector, RemoteSession, StateStore,
};
use crate::application::sync::mirror_down;
use crate::domain::remote::base_name;
use crate::domain::{ProvisionError, ProvisioningState};

impl<P, K, C, S, R> ProvisioningWorkflow<'_, P, K, C, S, R>
where
    P: CloudProvider,
    K: KeyGenerator,
    C: RemoteConnector,
    S: StateStore,
    R: ProgressReporter,
{
    /// Destroy the instance recorded in `state`.
    ///
    /// With `app.cache` enabled the remote cache is downloaded first; if that
    /// fails the instance is left running so nothing is lost.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no instance, the cache download fails,
    /// or the provider refuses the deletion.
    pub async fn tear_down(&self, state: &ProvisioningState) -> Result<()> {
        let handle = state.instance.as_ref().ok_or(ProvisionError::NoInstance)?;

        if self.config.app.cache {
            let target = session_target(self.root, self.layout(), state)?;
            let cache_dir = &self.layout().cache_dir;
            self.reporter.step("saving remote cache...");
            let session = self.connector.connect(&target).await?;
            let result = mirror_down(
                session.transfer_channel(),
                base_name(cache_dir),
                &self.root.join(cache_dir),
            )
            .await;
            session.disconnect().await;
            result.context("downloading cache")?;
            self.reporter.success("cache saved");
        }

        self.reporter
            .step(&format!("destroying instance {}...", handle.name));
        self.provider
            .destroy_instance(handle.id)
            .await
            .with_context(|| format!("destroying instance {}", handle.id))?;
        self.reporter
            .success(&format!("instance {} destroyed", handle.name));
        Ok(())
    }
}
