//! Steps (b) and (c): the compute instance exists, is active, and accepts
//! sessions.

use anyhow::{Context, Result};

use super::{ProvisioningWorkflow, target_for};
use crate::application::ports::{
    CloudProvider, InstanceRequest, KeyGenerator, ProgressReporter, RemoteConnector,
    RemoteSession, StateStore,
};
use crate::domain::{InstanceHandle, ProvisionError, ProvisioningState};

/// Harmless command used to prove a session really works.
const REACHABILITY_CHECK: &str = "echo hello world";

impl<P, K, C, S, R> ProvisioningWorkflow<'_, P, K, C, S, R>
where
    P: CloudProvider,
    K: KeyGenerator,
    C: RemoteConnector,
    S: StateStore,
    R: ProgressReporter,
{
    pub(super) async fn ensure_instance(&self, state: &mut ProvisioningState) -> Result<()> {
        if let Some(handle) = &state.instance {
            tracing::info!(id = handle.id, "instance already created, skipping");
            return Ok(());
        }
        let key = state.key_identifier.as_deref().ok_or(ProvisionError::NoKey)?;

        let key_ids: Vec<u64> = self
            .provider
            .find_keys(key)
            .await
            .context("looking up registered keys")?
            .iter()
            .map(|k| k.id)
            .collect();
        if key_ids.is_empty() {
            anyhow::bail!("access key {key} is not registered with the provider");
        }

        let shape = &self.config.instance;
        self.reporter.step(&format!(
            "creating instance {} ({}, {})...",
            shape.name, shape.size, shape.region
        ));
        let handle = self
            .provider
            .create_instance(&InstanceRequest { shape, key_ids })
            .await
            .with_context(|| format!("creating instance {}", shape.name))?;
        self.reporter
            .success(&format!("instance {} requested (id {})", handle.name, handle.id));
        state.instance = Some(handle);
        Ok(())
    }

    /// Poll until the instance is active and a trivial command succeeds over a
    /// fresh session, then record the refreshed handle.
    pub(super) async fn wait_until_reachable(&self, state: &mut ProvisioningState) -> Result<()> {
        let key = state.key_identifier.as_deref().ok_or(ProvisionError::NoKey)?;
        let id = state.instance.as_ref().ok_or(ProvisionError::NoInstance)?.id;

        self.reporter
            .wait_started("waiting for instance to become reachable...");
        let handle = match self
            .waiter
            .wait_until(move |attempt| self.check_reachable(id, key, attempt))
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                self.reporter.warn("instance did not become reachable");
                return Err(e).context("waiting for instance");
            }
        };
        self.reporter.wait_finished(&format!(
            "instance reachable at {}",
            handle.address.as_deref().unwrap_or("?")
        ));
        state.instance = Some(handle);
        Ok(())
    }

    async fn check_reachable(&self, id: u64, key: &str, attempt: u32) -> Result<InstanceHandle> {
        tracing::debug!(id, attempt, "checking instance");
        let handle = self.provider.instance(id).await?;
        if !handle.is_active() {
            return Err(ProvisionError::NotActive {
                id,
                status: handle.status.as_str().to_string(),
            }
            .into());
        }
        let target = target_for(self.root, self.layout(), &handle, key)?;

        let session = self.connector.connect(&target).await?;
        let outcome = session.run(REACHABILITY_CHECK, &mut |_| {}).await;
        session.disconnect().await;

        let outcome = outcome?;
        if !outcome.success() {
            return Err(ProvisionError::RemoteCommand {
                step: "reachability check",
                status: outcome.code(),
            }
            .into());
        }
        Ok(handle)
    }
}
