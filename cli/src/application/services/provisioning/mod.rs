//! Resumable provisioning workflow.
//!
//! Steps run in a fixed order and each is gated by a flag in
//! [`ProvisioningState`]. The state is checkpointed through the
//! [`StateStore`] port after every step that succeeds, so an interrupted run
//! resumes where it stopped. Imports only from `crate::domain` and
//! `crate::application`.

mod app_setup;
mod credentials;
mod host_setup;
mod instance;
mod teardown;

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{
    CloudProvider, KeyGenerator, ProgressReporter, REMOTE_USER, RemoteConnector, RemoteSession,
    SessionTarget, StateStore,
};
use crate::application::retry::RetryWaiter;
use crate::domain::config::{DeployConfig, LocalLayout};
use crate::domain::{InstanceHandle, ProvisionError, ProvisioningState};

/// Why the application step is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployIntent {
    /// Part of `up`: full content upload, including the cache.
    Up,
    /// Standalone restart: the remote cache is newer than the local one and
    /// is left alone.
    Restart,
}

/// Everything the workflow talks to, injected by the caller.
pub struct ProvisioningWorkflow<'a, P, K, C, S, R> {
    pub provider: &'a P,
    pub keys: &'a K,
    pub connector: &'a C,
    pub store: &'a S,
    pub reporter: &'a R,
    pub config: &'a DeployConfig,
    /// Directory the local layout paths are relative to.
    pub root: &'a Path,
    pub waiter: RetryWaiter,
}

impl<P, K, C, S, R> ProvisioningWorkflow<'_, P, K, C, S, R>
where
    P: CloudProvider,
    K: KeyGenerator,
    C: RemoteConnector,
    S: StateStore,
    R: ProgressReporter,
{
    /// Bring the deployment up, performing only the steps not yet done.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error. Flags of steps that completed
    /// before it are set and already checkpointed.
    pub async fn bring_up(&self, state: &mut ProvisioningState) -> Result<()> {
        self.ensure_credential(state).await?;
        self.checkpoint(state).await?;

        self.ensure_instance(state).await?;
        self.checkpoint(state).await?;

        self.wait_until_reachable(state).await?;
        self.checkpoint(state).await?;

        self.ensure_host_setup(state).await?;
        self.checkpoint(state).await?;

        self.redeploy_app(state, DeployIntent::Up).await?;
        self.checkpoint(state).await
    }

    async fn checkpoint(&self, state: &ProvisioningState) -> Result<()> {
        tracing::debug!(?state, "checkpointing state");
        self.store.save(state).await.context("saving provisioning state")
    }

    fn layout(&self) -> &LocalLayout {
        &self.config.layout
    }

    /// Run `command` in `session`, echoing its output, and fail on a
    /// non-zero exit.
    async fn run_checked(
        &self,
        session: &C::Session,
        command: &str,
        step: &'static str,
    ) -> Result<()> {
        tracing::debug!(command, "running remote command");
        let outcome = session
            .run(command, &mut |line| self.reporter.detail(line))
            .await
            .with_context(|| format!("running '{command}'"))?;
        if !outcome.success() {
            return Err(ProvisionError::RemoteCommand {
                step,
                status: outcome.code(),
            }
            .into());
        }
        Ok(())
    }
}

/// Session parameters for the instance recorded in `state`.
///
/// # Errors
///
/// Returns an error if the state has no key, no instance, or the instance has
/// no address yet.
pub fn session_target(
    root: &Path,
    layout: &LocalLayout,
    state: &ProvisioningState,
) -> Result<SessionTarget> {
    let key = state.key_identifier.as_deref().ok_or(ProvisionError::NoKey)?;
    let handle = state.instance.as_ref().ok_or(ProvisionError::NoInstance)?;
    target_for(root, layout, handle, key)
}

fn target_for(
    root: &Path,
    layout: &LocalLayout,
    handle: &InstanceHandle,
    key: &str,
) -> Result<SessionTarget> {
    let address = handle
        .address
        .clone()
        .ok_or(ProvisionError::NoAddress { id: handle.id })?;
    let keys_dir = root.join(&layout.keys_dir);
    Ok(SessionTarget {
        address,
        user: REMOTE_USER.to_string(),
        identity_file: keys_dir.join(key),
        known_hosts: keys_dir.join(format!("{key}.known_hosts")),
    })
}
