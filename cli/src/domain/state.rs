//! Provisioning state record and its invariants.
//!
//! The record is the single source of truth for resuming a deployment: every
//! step flag is read from here, never from in-memory context. This module is
//! free of I/O; `infra::state` reads and writes it.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::StateError;

/// Bumped whenever the persisted layout changes shape.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Prefix of generated access-key names.
pub const KEY_NAME_PREFIX: &str = "gamehost";

/// Persisted progress of one deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisioningState {
    pub schema_version: u32,
    /// Name of the generated key pair; `None` until the credential step runs.
    pub key_identifier: Option<String>,
    /// The public half has been registered with the provider.
    pub credential_uploaded: bool,
    /// The created compute instance; `None` until creation.
    pub instance: Option<InstanceHandle>,
    /// Host prerequisites are installed.
    pub host_setup_done: bool,
    /// Application deployed and (re)started during the current invocation.
    pub app_setup_done: bool,
}

impl Default for ProvisioningState {
    fn default() -> Self {
        Self::fresh()
    }
}

impl ProvisioningState {
    /// A record with every flag cleared.
    #[must_use]
    pub fn fresh() -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            key_identifier: None,
            credential_uploaded: false,
            instance: None,
            host_setup_done: false,
            app_setup_done: false,
        }
    }

    /// Reset per-invocation flags. Called once right after loading.
    pub fn begin_invocation(&mut self) {
        self.app_setup_done = false;
    }

    /// Checks the cross-field invariants of the record.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Inconsistent` describing the violated invariant.
    pub fn validate(&self) -> Result<()> {
        if self.credential_uploaded && self.key_identifier.is_none() {
            return Err(StateError::Inconsistent("credential uploaded without a key name").into());
        }
        if self.host_setup_done && self.instance.is_none() {
            return Err(StateError::Inconsistent("host setup marked done without an instance").into());
        }
        Ok(())
    }
}

/// Opaque reference to a provider compute instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceHandle {
    pub id: u64,
    pub name: String,
    /// Public IPv4 address, once the provider has assigned one.
    pub address: Option<String>,
    pub status: InstanceStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl InstanceHandle {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == InstanceStatus::Active
    }
}

/// Lifecycle status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    New,
    Active,
    Off,
    Archive,
    #[serde(other)]
    Unknown,
}

impl InstanceStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Active => "active",
            Self::Off => "off",
            Self::Archive => "archive",
            Self::Unknown => "unknown",
        }
    }
}

/// Checks that a raw JSON record carries the current schema version before it
/// is deserialized field by field.
///
/// # Errors
///
/// Returns `StateError::MissingSchemaVersion` or `StateError::SchemaMismatch`.
pub fn check_schema_version(raw: &serde_json::Value) -> Result<()> {
    let found = raw
        .get("schema_version")
        .and_then(serde_json::Value::as_u64)
        .ok_or(StateError::MissingSchemaVersion)?;
    if found != u64::from(STATE_SCHEMA_VERSION) {
        return Err(StateError::SchemaMismatch {
            found,
            expected: STATE_SCHEMA_VERSION,
        }
        .into());
    }
    Ok(())
}

/// Generate a fresh key pair name.
///
/// Format: `gamehost_` followed by 8 lowercase hex characters.
/// Entropy sources: nanosecond timestamp and a `RandomState` hash.
#[must_use]
pub fn generate_key_identifier() -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u128(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    );
    hasher.write_u64(RandomState::new().build_hasher().finish());
    format!("{KEY_NAME_PREFIX}_{:08x}", hasher.finish() & 0xffff_ffff)
}
