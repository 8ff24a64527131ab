//! Infrastructure implementation of the `StateStore` port.
//!
//! `JsonStateStore` provides async load/save using `tokio::task::spawn_blocking`
//! with atomic write (temp file + rename) to prevent state corruption.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::StateStore;
use crate::domain::ProvisioningState;
use crate::domain::state::check_schema_version;

/// State file manager for one deployment target.
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Synchronous load, used by `load` via `spawn_blocking`.
    fn load_sync(path: &Path) -> Result<Option<ProvisioningState>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading state file {}", path.display()))?;
        let raw: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("parsing state file {}", path.display()))?;
        check_schema_version(&raw)
            .with_context(|| format!("loading state file {}", path.display()))?;
        let state: ProvisioningState = serde_json::from_value(raw)
            .with_context(|| format!("parsing state file {}", path.display()))?;
        state
            .validate()
            .with_context(|| format!("loading state file {}", path.display()))?;
        Ok(Some(state))
    }

    /// Synchronous save, used by `save` via `spawn_blocking`.
    fn save_sync(path: &Path, state: &ProvisioningState) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(state).context("serializing state")?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("finalizing state file {}", path.display()))?;

        Ok(())
    }
}

impl StateStore for JsonStateStore {
    async fn load(&self) -> Result<Option<ProvisioningState>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::load_sync(&path))
            .await
            .context("state load task panicked")?
    }

    async fn save(&self, state: &ProvisioningState) -> Result<()> {
        let path = self.path.clone();
        let state = state.clone();
        tokio::task::spawn_blocking(move || Self::save_sync(&path, &state))
            .await
            .context("state save task panicked")?
    }
}
