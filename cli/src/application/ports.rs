//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::time::Duration;

use anyhow::Result;

use crate::domain::config::InstanceShape;
use crate::domain::{DirectoryEntry, InstanceHandle, ProvisioningState};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Remote login user on the provisioned host.
pub const REMOTE_USER: &str = "root";

// ── Value Types ───────────────────────────────────────────────────────────────

/// Where and how to open a remote session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    /// Host name or IP address.
    pub address: String,
    /// Login user.
    pub user: String,
    /// Private key used to authenticate.
    pub identity_file: PathBuf,
    /// Known-hosts file dedicated to this deployment.
    pub known_hosts: PathBuf,
}

/// Result of one remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit code, `None` when the command was killed by a signal.
    pub status: Option<i32>,
    /// Every line the command printed (stdout with stderr folded in).
    pub lines: Vec<String>,
}

impl CommandOutcome {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Exit code for error messages; signals are reported as `-1`.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.status.unwrap_or(-1)
    }
}

/// A key registered with the cloud provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderKey {
    pub id: u64,
    pub name: String,
    pub fingerprint: String,
}

/// Launch parameters for creating a new compute instance.
pub struct InstanceRequest<'a> {
    pub shape: &'a InstanceShape,
    /// Provider ids of the keys to install on the instance.
    pub key_ids: Vec<u64>,
}

// ── Cloud Provider Port ───────────────────────────────────────────────────────

/// Control-plane operations of the cloud provider.
#[allow(async_fn_in_trait)]
pub trait CloudProvider {
    /// Register a public key under `name`.
    async fn register_key(&self, name: &str, public_key: &str) -> Result<ProviderKey>;
    /// Find registered keys named `name`.
    async fn find_keys(&self, name: &str) -> Result<Vec<ProviderKey>>;
    /// Request creation of a new instance. Creation completes asynchronously.
    async fn create_instance(&self, request: &InstanceRequest<'_>) -> Result<InstanceHandle>;
    /// Fetch the current view of an instance.
    async fn instance(&self, id: u64) -> Result<InstanceHandle>;
    /// Destroy an instance.
    async fn destroy_instance(&self, id: u64) -> Result<()>;
}

// ── Credential Port ───────────────────────────────────────────────────────────

/// Generates access key pairs on the local machine.
#[allow(async_fn_in_trait)]
pub trait KeyGenerator {
    /// Write a new key pair to `private_key` and `private_key.pub`.
    /// Returns the public key in OpenSSH format.
    async fn generate(&self, private_key: &Path, comment: &str) -> Result<String>;
    /// Read the public half of an existing pair, `None` if either file is missing.
    async fn existing(&self, private_key: &Path) -> Result<Option<String>>;
}

// ── Remote Session Ports ──────────────────────────────────────────────────────

/// Opens sessions to a remote host.
#[allow(async_fn_in_trait)]
pub trait RemoteConnector {
    type Session: RemoteSession;

    /// Establish one session. The caller must `disconnect` it on every path.
    async fn connect(&self, target: &SessionTarget) -> Result<Self::Session>;

    /// Run `command` (or a login shell when `None`) with the terminal attached.
    async fn attach(&self, target: &SessionTarget, command: Option<&str>) -> Result<ExitStatus>;
}

/// One live connection to the target host.
#[allow(async_fn_in_trait)]
pub trait RemoteSession {
    type Channel: TransferChannel;

    /// Execute a shell command, passing each output line to `on_line` as it
    /// arrives. Only transport failures are errors; a non-zero exit is not.
    async fn run(
        &self,
        command: &str,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<CommandOutcome>;

    /// The file-transfer sub-channel bound to this session.
    fn transfer_channel(&self) -> &Self::Channel;

    /// Release the session. Never fails; problems are logged.
    async fn disconnect(self);
}

/// File-transfer operations on an open session.
#[allow(async_fn_in_trait)]
pub trait TransferChannel {
    /// Upload a single local file to `remote`, overwriting it.
    async fn put(&self, local: &Path, remote: &str) -> Result<()>;
    /// Download a single remote file to `local`, overwriting it.
    async fn get(&self, remote: &str, local: &Path) -> Result<()>;
    /// Create one remote directory. Fails with
    /// `TransferError::AlreadyExists` when the path is already present.
    async fn mkdir(&self, remote: &str) -> Result<()>;
    /// List a remote directory with entry types.
    async fn list(&self, remote: &str) -> Result<Vec<DirectoryEntry>>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program, handing each stdout line to `on_line` as it is printed.
    /// No timeout applies; long-running setup scripts stream through here.
    async fn run_streaming(
        &self,
        program: &str,
        args: &[&str],
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ExitStatus>;
    /// Run a program with inherited stdio and return only its exit status.
    async fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Synchronous trait.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Echo one line of remote command output.
    fn detail(&self, line: &str);
    /// A potentially long wait begins. Ended by `wait_finished` or by the
    /// next `warn`.
    fn wait_started(&self, message: &str) {
        self.step(message);
    }
    /// The wait begun by `wait_started` succeeded.
    fn wait_finished(&self, message: &str) {
        self.success(message);
    }
}

// ── State Port ────────────────────────────────────────────────────────────────

/// Abstracts provisioning state persistence. Always whole-record.
#[allow(async_fn_in_trait)]
pub trait StateStore {
    /// Load the record, returning `None` if none has been saved yet.
    async fn load(&self) -> Result<Option<ProvisioningState>>;
    /// Persist the whole record, replacing any previous one.
    async fn save(&self, state: &ProvisioningState) -> Result<()>;
}
