//! Step (a): access key pair exists locally and is registered with the
//! provider.

use anyhow::{Context, Result};

use super::ProvisioningWorkflow;
use crate::application::ports::{
    CloudProvider, KeyGenerator, ProgressReporter, RemoteConnector, StateStore,
};
use crate::domain::ProvisioningState;
use crate::domain::state::generate_key_identifier;

impl<P, K, C, S, R> ProvisioningWorkflow<'_, P, K, C, S, R>
where
    P: CloudProvider,
    K: KeyGenerator,
    C: RemoteConnector,
    S: StateStore,
    R: ProgressReporter,
{
    pub(super) async fn ensure_credential(&self, state: &mut ProvisioningState) -> Result<()> {
        if state.credential_uploaded {
            tracing::info!("access key already registered, skipping");
            return Ok(());
        }

        let keys_dir = self.root.join(&self.layout().keys_dir);
        tokio::fs::create_dir_all(&keys_dir)
            .await
            .with_context(|| format!("creating directory {}", keys_dir.display()))?;

        // A previous run may have generated the pair and crashed before
        // registering it; reuse it so the name in state stays valid.
        let existing = match state.key_identifier.as_deref() {
            Some(name) => self
                .keys
                .existing(&keys_dir.join(name))
                .await?
                .map(|public_key| (name.to_string(), public_key)),
            None => None,
        };
        let (name, public_key) = if let Some(pair) = existing {
            tracing::info!(name = %pair.0, "reusing local key pair");
            pair
        } else {
            let name = generate_key_identifier();
            self.reporter.step(&format!("creating access key {name}..."));
            let public_key = self
                .keys
                .generate(&keys_dir.join(&name), &name)
                .await
                .context("generating access key pair")?;
            (name, public_key)
        };
        state.key_identifier = Some(name.clone());
        self.checkpoint(state).await?;

        let registered = self
            .provider
            .find_keys(&name)
            .await
            .context("looking up registered keys")?;
        if registered.is_empty() {
            self.reporter.step(&format!("registering access key {name}..."));
            self.provider
                .register_key(&name, public_key.trim())
                .await
                .with_context(|| format!("registering key {name}"))?;
        } else {
            tracing::info!(name = %name, "key already registered with provider");
        }

        state.credential_uploaded = true;
        self.reporter.success(&format!("access key {name} registered"));
        Ok(())
    }
}
