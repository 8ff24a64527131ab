//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::time::Duration;

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors detected while validating the deployment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config is missing required field '{0}'.")]
    MissingField(&'static str),

    #[error("Config file {0} does not exist.")]
    FileNotFound(String),

    #[error("Directory '{path}' referenced by {field} was not found.")]
    MissingDirectory { field: String, path: String },

    #[error("Mod '{name}' is listed in config but was not found in the {dir}/ directory.")]
    MissingMod { name: String, dir: String },

    #[error("{0} is not set in app.settings. Set it to use the console.")]
    ConsoleDisabled(String),
}

// ── State errors ──────────────────────────────────────────────────────────────

/// Errors raised when the persisted provisioning record cannot be trusted.
#[derive(Debug, Error)]
pub enum StateError {
    #[error(
        "State file has schema version {found}, this build expects {expected}.\n\
         Tear down with the matching release or remove the state file manually."
    )]
    SchemaMismatch { found: u64, expected: u32 },

    #[error("State file has no schema_version field; refusing to guess its layout.")]
    MissingSchemaVersion,

    #[error("State is inconsistent: {0}")]
    Inconsistent(&'static str),
}

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Failures of individual provisioning steps.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("No access key has been created yet.")]
    NoKey,

    #[error("No instance exists yet. Run 'gamehost up' first.")]
    NoInstance,

    #[error("Instance {id} is not active yet (status: {status}).")]
    NotActive { id: u64, status: String },

    #[error("Instance {id} has no public address yet.")]
    NoAddress { id: u64 },

    #[error("{step} failed: remote command exited with status {status}.")]
    RemoteCommand { step: &'static str, status: i32 },
}

// ── Transfer errors ───────────────────────────────────────────────────────────

/// Failures reported by a file-transfer channel.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Remote path '{0}' already exists.")]
    AlreadyExists(String),

    #[error("Transfer of '{path}' failed: {reason}")]
    Failed { path: String, reason: String },
}

// ── Wait errors ───────────────────────────────────────────────────────────────

/// Raised by the retry waiter when its deadline elapses.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("Timed out after {elapsed:?} ({attempts} attempts). Last failure: {last}")]
    Timeout {
        elapsed: Duration,
        attempts: u32,
        #[source]
        last: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}
