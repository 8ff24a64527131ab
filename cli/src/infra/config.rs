//! Loading the deployment configuration and checking the local layout.

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::config::{DeployConfig, validate_config};
use crate::domain::error::ConfigError;

/// Read, parse and validate the YAML configuration at `path`.
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if the file is absent, a parse error,
/// or the first validation failure.
pub fn load_config(path: &Path) -> Result<DeployConfig> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()).into());
    }
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let config: DeployConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Check that every local directory the workflow will read exists under
/// `root`: the mods directory and one subdirectory per enabled mod, the
/// security templates, and the cache when caching is on.
///
/// # Errors
///
/// Returns `ConfigError::MissingDirectory` or `ConfigError::MissingMod` for
/// the first absent path.
pub fn check_local_layout(config: &DeployConfig, root: &Path) -> Result<()> {
    let layout = &config.layout;
    require_dir(root, "layout.mods_dir", &layout.mods_dir)?;
    for name in &config.app.mods {
        if !root.join(&layout.mods_dir).join(name).is_dir() {
            return Err(ConfigError::MissingMod {
                name: name.clone(),
                dir: layout.mods_dir.clone(),
            }
            .into());
        }
    }
    require_dir(root, "layout.security_dir", &layout.security_dir)?;
    if config.app.cache {
        require_dir(root, "layout.cache_dir", &layout.cache_dir)?;
    }
    Ok(())
}

fn require_dir(root: &Path, field: &str, dir: &str) -> Result<()> {
    if root.join(dir).is_dir() {
        return Ok(());
    }
    Err(ConfigError::MissingDirectory {
        field: field.to_string(),
        path: dir.to_string(),
    }
    .into())
}
