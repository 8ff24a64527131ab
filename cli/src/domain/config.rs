//! Domain types and validators for the deployment configuration.
//!
//! Pure functions only: no I/O and no filesystem access. Checks that
//! need the filesystem (content directories) live in `infra::config`.

use std::fmt;

use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com/v2";
pub const DEFAULT_CONSOLE_PORT: u16 = 50301;

/// Settings key that must equal `1` for the remote console to be reachable.
pub const CONSOLE_TOGGLE_KEY: &str = "sv_tcpr";
/// Settings key holding the console password; must be non-empty.
pub const CONSOLE_PASSWORD_KEY: &str = "sv_rconpassword";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration, loaded from `config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeployConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub instance: InstanceShape,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub layout: LocalLayout,
}

/// Cloud provider credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
        }
    }
}

/// Parameters passed to the provider when creating the instance.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct InstanceShape {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub monitoring: bool,
    #[serde(default)]
    pub ipv6: bool,
}

/// Application (game server) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Rendered to `autoconfig.cfg` as `key = value` lines, in file order.
    #[serde(default)]
    pub settings: IndexMap<String, SettingValue>,
    /// Rendered to `mods.cfg`, one name per line.
    #[serde(default)]
    pub mods: Vec<String>,
    /// Upload the cache directory on `up`, download it on `down`.
    #[serde(default)]
    pub cache: bool,
    /// Compose service whose logs `follow-logs` streams.
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings: IndexMap::new(),
            mods: Vec::new(),
            cache: false,
            service: default_service(),
            security: SecurityConfig::default(),
        }
    }
}

/// Access-control user lists, one per tier.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    #[serde(default)]
    pub superadmins: Vec<String>,
    #[serde(default)]
    pub admins: Vec<String>,
}

/// Remote console collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_console_port")]
    pub port: u16,
    #[serde(default = "default_console_program")]
    pub program: Vec<String>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            port: default_console_port(),
            program: default_console_program(),
        }
    }
}

/// Local files and directories the workflow consumes, relative to the
/// working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalLayout {
    #[serde(default = "default_setup_script")]
    pub setup_script: String,
    #[serde(default = "default_compose_file")]
    pub compose_file: String,
    #[serde(default = "default_extra_setup_files")]
    pub extra_setup_files: Vec<String>,
    #[serde(default = "default_mods_dir")]
    pub mods_dir: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "default_security_dir")]
    pub security_dir: String,
    #[serde(default = "default_keys_dir")]
    pub keys_dir: String,
}

impl Default for LocalLayout {
    fn default() -> Self {
        Self {
            setup_script: default_setup_script(),
            compose_file: default_compose_file(),
            extra_setup_files: default_extra_setup_files(),
            mods_dir: default_mods_dir(),
            cache_dir: default_cache_dir(),
            security_dir: default_security_dir(),
            keys_dir: default_keys_dir(),
        }
    }
}

impl LocalLayout {
    /// Files uploaded before running the host setup script, script first.
    #[must_use]
    pub fn setup_artifacts(&self) -> Vec<&str> {
        let mut files = vec![self.setup_script.as_str(), self.compose_file.as_str()];
        files.extend(self.extra_setup_files.iter().map(String::as_str));
        files
    }
}

/// A scalar value in `app.settings`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Spelled as the server's own config files spell them.
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.is_finite() && x.fract().abs() < f64::EPSILON => write!(f, "{x:.1}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}
fn default_service() -> String {
    "kag".to_string()
}
fn default_console_port() -> u16 {
    DEFAULT_CONSOLE_PORT
}
fn default_console_program() -> Vec<String> {
    ["python3", "-m", "kagtcprlib.webinterface"]
        .map(String::from)
        .to_vec()
}
fn default_setup_script() -> String {
    "droplet_setup.sh".to_string()
}
fn default_compose_file() -> String {
    "docker-compose.yaml".to_string()
}
fn default_extra_setup_files() -> Vec<String> {
    vec!["Dockerfile.kag".to_string()]
}
fn default_mods_dir() -> String {
    "Mods".to_string()
}
fn default_cache_dir() -> String {
    "Cache".to_string()
}
fn default_security_dir() -> String {
    "Security".to_string()
}
fn default_keys_dir() -> String {
    "ssh_keys".to_string()
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates the fields every command needs.
///
/// # Errors
///
/// Returns `ConfigError::MissingField` naming the first absent field.
pub fn validate_config(config: &DeployConfig) -> Result<()> {
    if config.provider.token.trim().is_empty() {
        return Err(ConfigError::MissingField("provider.token").into());
    }
    let shape = &config.instance;
    for (field, value) in [
        ("instance.name", &shape.name),
        ("instance.region", &shape.region),
        ("instance.size", &shape.size),
        ("instance.image", &shape.image),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(field).into());
        }
    }
    Ok(())
}

/// Console connection parameters, available only when both toggles are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleAccess {
    pub port: u16,
    pub password: String,
}

/// Checks the two console prerequisites in `app.settings`.
///
/// # Errors
///
/// Returns `ConfigError::ConsoleDisabled` naming the first unmet toggle.
pub fn console_access(config: &DeployConfig) -> Result<ConsoleAccess> {
    let settings = &config.app.settings;
    let enabled = match settings.get(CONSOLE_TOGGLE_KEY) {
        Some(SettingValue::Int(1) | SettingValue::Bool(true)) => true,
        Some(SettingValue::Text(s)) => s.trim() == "1",
        _ => false,
    };
    if !enabled {
        return Err(ConfigError::ConsoleDisabled(CONSOLE_TOGGLE_KEY.to_string()).into());
    }
    let password = settings
        .get(CONSOLE_PASSWORD_KEY)
        .map(ToString::to_string)
        .unwrap_or_default();
    if password.is_empty() {
        return Err(ConfigError::ConsoleDisabled(CONSOLE_PASSWORD_KEY.to_string()).into());
    }
    Ok(ConsoleAccess {
        port: config.console.port,
        password,
    })
}

// ── Unit tests ───────────────────────────────────────────────────────────────
