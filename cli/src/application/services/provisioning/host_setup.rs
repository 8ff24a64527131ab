//! Step (d): one-time host preparation via the setup script.

use anyhow::{Context, Result};

use super::{ProvisioningWorkflow, session_target};
use crate::application::ports::{
    CloudProvider, KeyGenerator, ProgressReporter, RemoteConnector, RemoteSession, StateStore,
    TransferChannel,
};
use crate::domain::remote::{base_name, shell_quote};
use crate::domain::{ProvisionError, ProvisioningState};

impl<P, K, C, S, R> ProvisioningWorkflow<'_, P, K, C, S, R>
where
    P: CloudProvider,
    K: KeyGenerator,
    C: RemoteConnector,
    S: StateStore,
    R: ProgressReporter,
{
    pub(super) async fn ensure_host_setup(&self, state: &mut ProvisioningState) -> Result<()> {
        if state.host_setup_done {
            tracing::info!("host setup already done, skipping");
            return Ok(());
        }
        let handle = state.instance.as_ref().ok_or(ProvisionError::NoInstance)?;
        if !handle.is_active() {
            return Err(ProvisionError::NotActive {
                id: handle.id,
                status: handle.status.as_str().to_string(),
            }
            .into());
        }
        let target = session_target(self.root, self.layout(), state)?;

        self.reporter.step("setting up host...");
        let session = self.connector.connect(&target).await?;
        let result = self.run_host_setup(&session).await;
        session.disconnect().await;
        result?;

        state.host_setup_done = true;
        self.reporter.success("host set up");
        Ok(())
    }

    async fn run_host_setup(&self, session: &C::Session) -> Result<()> {
        let layout = self.layout();
        let channel = session.transfer_channel();
        for artifact in layout.setup_artifacts() {
            let local = self.root.join(artifact);
            let remote = base_name(artifact);
            tracing::debug!(local = %local.display(), remote, "uploading setup artifact");
            channel
                .put(&local, remote)
                .await
                .with_context(|| format!("uploading {}", local.display()))?;
        }

        let script = shell_quote(base_name(&layout.setup_script));
        self.run_checked(session, &format!("chmod +x {script}"), "host setup")
            .await?;
        self.run_checked(session, &format!("./{script} 2>&1"), "host setup")
            .await
    }
}
