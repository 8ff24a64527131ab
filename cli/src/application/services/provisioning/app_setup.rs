//! Step (e): push application content and (re)start the services.
//!
//! Runs on every `up` and on `restart-app`; its flag is reset at the start of
//! each invocation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use super::{DeployIntent, ProvisioningWorkflow, session_target};
use crate::application::ports::{
    CloudProvider, KeyGenerator, ProgressReporter, RemoteConnector, RemoteSession, StateStore,
    TransferChannel,
};
use crate::application::sync::{ensure_remote_dir, mirror_up};
use crate::domain::ProvisioningState;
use crate::domain::config::DeployConfig;
use crate::domain::remote::base_name;
use crate::domain::render::{
    MODS_FILE, SETTINGS_FILE, render_access_template, render_enabled_list, render_settings,
    users_for_template,
};

const COMPOSE_DOWN: &str = "docker-compose down 2>&1";
const COMPOSE_UP: &str = "docker-compose up -d 2>&1";

impl<P, K, C, S, R> ProvisioningWorkflow<'_, P, K, C, S, R>
where
    P: CloudProvider,
    K: KeyGenerator,
    C: RemoteConnector,
    S: StateStore,
    R: ProgressReporter,
{
    /// Upload application content and restart the services.
    ///
    /// The cache directory is uploaded only for [`DeployIntent::Up`] with
    /// `app.cache` enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance is unknown, a transfer fails, or the
    /// services fail to start.
    pub async fn redeploy_app(
        &self,
        state: &mut ProvisioningState,
        intent: DeployIntent,
    ) -> Result<()> {
        let target = session_target(self.root, self.layout(), state)?;

        self.reporter.step("deploying application...");
        let session = self.connector.connect(&target).await?;
        let result = self.run_app_setup(&session, intent).await;
        session.disconnect().await;
        result?;

        state.app_setup_done = true;
        self.reporter.success("application deployed");
        Ok(())
    }

    async fn run_app_setup(&self, session: &C::Session, intent: DeployIntent) -> Result<()> {
        let layout = self.layout();
        let channel = session.transfer_channel();

        let compose = self.root.join(&layout.compose_file);
        channel
            .put(&compose, base_name(&layout.compose_file))
            .await
            .with_context(|| format!("uploading {}", compose.display()))?;

        self.mirror_dir(channel, &layout.mods_dir).await?;
        if intent == DeployIntent::Up && self.config.app.cache {
            self.mirror_dir(channel, &layout.cache_dir).await?;
        }

        let scratch = render_scratch(self.config, self.root).await?;
        for name in [SETTINGS_FILE, MODS_FILE] {
            channel
                .put(&scratch.path().join(name), name)
                .await
                .with_context(|| format!("uploading {name}"))?;
        }
        let security = base_name(&layout.security_dir);
        ensure_remote_dir(channel, security).await?;
        mirror_up(channel, &scratch.path().join(security), security).await?;
        drop(scratch);

        self.reporter.step("restarting services...");
        let down = session
            .run(COMPOSE_DOWN, &mut |line| self.reporter.detail(line))
            .await
            .context("stopping services")?;
        if !down.success() {
            tracing::info!(status = down.code(), "services were not running");
        }
        self.run_checked(session, COMPOSE_UP, "service start").await
    }

    async fn mirror_dir(&self, channel: &impl TransferChannel, dir: &str) -> Result<()> {
        let remote = base_name(dir);
        tracing::info!(local = dir, remote, "mirroring directory");
        ensure_remote_dir(channel, remote).await?;
        mirror_up(channel, &self.root.join(dir), remote)
            .await
            .with_context(|| format!("uploading {dir}"))
    }
}

/// Write the generated settings, mods list, and rendered security files into
/// a fresh scratch directory. The directory is removed when dropped.
async fn render_scratch(config: &DeployConfig, root: &Path) -> Result<TempDir> {
    let scratch = TempDir::new().context("creating scratch directory")?;
    let app = &config.app;

    write_file(
        scratch.path().join(SETTINGS_FILE),
        render_settings(&app.settings),
    )
    .await?;
    write_file(scratch.path().join(MODS_FILE), render_enabled_list(&app.mods)).await?;

    let source = root.join(&config.layout.security_dir);
    let target = scratch.path().join(base_name(&config.layout.security_dir));
    tokio::fs::create_dir(&target)
        .await
        .with_context(|| format!("creating {}", target.display()))?;
    let mut entries = tokio::fs::read_dir(&source)
        .await
        .with_context(|| format!("reading directory {}", source.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let template = tokio::fs::read_to_string(entry.path())
            .await
            .with_context(|| format!("reading {}", entry.path().display()))?;
        let rendered = match users_for_template(&name, &app.security) {
            Some(users) => render_access_template(&template, users),
            None => template,
        };
        write_file(target.join(&name), rendered).await?;
    }
    Ok(scratch)
}

async fn write_file(path: PathBuf, content: String) -> Result<()> {
    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("writing {}", path.display()))
}
