//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain`, never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod ports;
pub mod retry;
pub mod services;
pub mod sync;

pub use ports::{
    CloudProvider, CommandRunner, KeyGenerator, ProgressReporter, RemoteConnector, RemoteSession,
    SessionTarget, StateStore, TransferChannel,
};
pub use retry::RetryWaiter;
