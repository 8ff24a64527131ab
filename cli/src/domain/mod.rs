//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod console;
pub mod error;
pub mod remote;
pub mod render;
pub mod state;

pub use config::{DeployConfig, LocalLayout, validate_config};
pub use error::{ConfigError, ProvisionError, StateError, TransferError, WaitError};
pub use remote::{DirectoryEntry, EntryKind};
pub use state::{InstanceHandle, InstanceStatus, ProvisioningState};
