//! Shared fakes for unit tests.
//!
//! Every fake appends to one shared [`EventLog`] so tests can assert on the
//! relative order of provider calls, session commands, and transfers.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, bail};
use gamehost_cli::application::ports::{
    CloudProvider, CommandOutcome, CommandRunner, InstanceRequest, KeyGenerator, ProgressReporter,
    ProviderKey, RemoteConnector, RemoteSession, SessionTarget, StateStore, TransferChannel,
};
use gamehost_cli::domain::{
    DirectoryEntry, EntryKind, InstanceHandle, InstanceStatus, ProvisioningState, TransferError,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

pub fn exit_status(code: i32) -> ExitStatus {
    ExitStatus::from_raw(code << 8)
}

pub fn output(code: i32, stdout: &str, stderr: &str) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Ordered record of every fake interaction.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().expect("mutex poisoned").push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().expect("mutex poisoned").clone()
    }

    pub fn clear(&self) {
        self.0.lock().expect("mutex poisoned").clear();
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

// ── Cloud provider ───────────────────────────────────────────────────────────

pub const INSTANCE_ADDRESS: &str = "203.0.113.10";

/// Provider whose instances become active after a number of polls.
pub struct FakeProvider {
    log: EventLog,
    keys: Mutex<Vec<ProviderKey>>,
    instances: Mutex<HashMap<u64, InstanceHandle>>,
    polls: Mutex<HashMap<u64, u32>>,
    /// Polls answered with `new` before an instance reports `active`.
    pub polls_until_active: u32,
    /// When false the instance never becomes active.
    pub activates: bool,
}

impl FakeProvider {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            keys: Mutex::new(Vec::new()),
            instances: Mutex::new(HashMap::new()),
            polls: Mutex::new(HashMap::new()),
            polls_until_active: 2,
            activates: true,
        }
    }

    pub fn registered_keys(&self) -> Vec<ProviderKey> {
        self.keys.lock().expect("mutex poisoned").clone()
    }

    pub fn live_instances(&self) -> usize {
        self.instances.lock().expect("mutex poisoned").len()
    }
}

impl CloudProvider for FakeProvider {
    async fn register_key(&self, name: &str, public_key: &str) -> Result<ProviderKey> {
        self.log.push(format!("register_key:{name}"));
        assert!(public_key.starts_with("ssh-ed25519 "), "got {public_key}");
        let mut keys = self.keys.lock().expect("mutex poisoned");
        let key = ProviderKey {
            id: 100 + keys.len() as u64,
            name: name.to_string(),
            fingerprint: "aa:bb".into(),
        };
        keys.push(key.clone());
        Ok(key)
    }

    async fn find_keys(&self, name: &str) -> Result<Vec<ProviderKey>> {
        self.log.push(format!("find_keys:{name}"));
        Ok(self
            .registered_keys()
            .into_iter()
            .filter(|k| k.name == name)
            .collect())
    }

    async fn create_instance(&self, request: &InstanceRequest<'_>) -> Result<InstanceHandle> {
        self.log.push(format!("create_instance:{}", request.shape.name));
        assert!(!request.key_ids.is_empty(), "instance created without a key");
        let mut instances = self.instances.lock().expect("mutex poisoned");
        let handle = InstanceHandle {
            id: 5000 + instances.len() as u64,
            name: request.shape.name.clone(),
            address: None,
            status: InstanceStatus::New,
            created_at: None,
        };
        instances.insert(handle.id, handle.clone());
        Ok(handle)
    }

    async fn instance(&self, id: u64) -> Result<InstanceHandle> {
        self.log.push(format!("instance:{id}"));
        let mut polls = self.polls.lock().expect("mutex poisoned");
        let seen = polls.entry(id).or_insert(0);
        *seen += 1;
        let mut instances = self.instances.lock().expect("mutex poisoned");
        let Some(handle) = instances.get_mut(&id) else {
            bail!("droplet {id} not found");
        };
        if self.activates && *seen > self.polls_until_active {
            handle.status = InstanceStatus::Active;
            handle.address = Some(INSTANCE_ADDRESS.to_string());
        }
        Ok(handle.clone())
    }

    async fn destroy_instance(&self, id: u64) -> Result<()> {
        self.log.push(format!("destroy_instance:{id}"));
        self.instances.lock().expect("mutex poisoned").remove(&id);
        Ok(())
    }
}

// ── Key generator ────────────────────────────────────────────────────────────

/// Key generator that remembers which paths it "wrote".
pub struct FakeKeys {
    log: EventLog,
    generated: Mutex<Vec<PathBuf>>,
}

impl FakeKeys {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            generated: Mutex::new(Vec::new()),
        }
    }

    /// Pretend a pair already exists at `path`.
    pub fn preload(&self, path: &Path) {
        self.generated
            .lock()
            .expect("mutex poisoned")
            .push(path.to_path_buf());
    }
}

impl KeyGenerator for FakeKeys {
    async fn generate(&self, private_key: &Path, comment: &str) -> Result<String> {
        self.log.push(format!("generate:{comment}"));
        self.preload(private_key);
        Ok(format!("ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIFAKE {comment}\n"))
    }

    async fn existing(&self, private_key: &Path) -> Result<Option<String>> {
        let known = self
            .generated
            .lock()
            .expect("mutex poisoned")
            .iter()
            .any(|p| p == private_key);
        Ok(known.then(|| "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIFAKE existing".to_string()))
    }
}

// ── Remote connector, session, channel ───────────────────────────────────────

/// Connector whose "remote host" is a local directory.
pub struct FakeConnector {
    log: EventLog,
    remote: PathBuf,
    /// Commands containing this text exit with status 1.
    pub fail_on: Mutex<Option<String>>,
    /// Refuse connections until this many attempts have been made.
    pub refuse_first: Mutex<u32>,
}

impl FakeConnector {
    pub fn new(log: &EventLog, remote: &Path) -> Self {
        Self {
            log: log.clone(),
            remote: remote.to_path_buf(),
            fail_on: Mutex::new(None),
            refuse_first: Mutex::new(0),
        }
    }

    pub fn fail_commands_containing(&self, text: Option<&str>) {
        *self.fail_on.lock().expect("mutex poisoned") = text.map(String::from);
    }
}

impl RemoteConnector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, target: &SessionTarget) -> Result<FakeSession> {
        {
            let mut refuse = self.refuse_first.lock().expect("mutex poisoned");
            if *refuse > 0 {
                *refuse -= 1;
                self.log.push("connect_refused");
                bail!("connection refused");
            }
        }
        assert_eq!(target.user, "root");
        self.log.push(format!("connect:{}", target.address));
        Ok(FakeSession {
            log: self.log.clone(),
            fail_on: self.fail_on.lock().expect("mutex poisoned").clone(),
            channel: FakeChannel {
                log: self.log.clone(),
                root: self.remote.clone(),
            },
        })
    }

    async fn attach(&self, target: &SessionTarget, command: Option<&str>) -> Result<ExitStatus> {
        self.log
            .push(format!("attach:{}:{}", target.address, command.unwrap_or("<shell>")));
        Ok(exit_status(0))
    }
}

pub struct FakeSession {
    log: EventLog,
    fail_on: Option<String>,
    channel: FakeChannel,
}

impl RemoteSession for FakeSession {
    type Channel = FakeChannel;

    async fn run(&self, command: &str, on_line: &mut dyn FnMut(&str)) -> Result<CommandOutcome> {
        self.log.push(format!("run:{command}"));
        let failed = self
            .fail_on
            .as_deref()
            .is_some_and(|needle| command.contains(needle));
        let line = if failed { "boom" } else { "ok" };
        on_line(line);
        Ok(CommandOutcome {
            status: Some(i32::from(failed)),
            lines: vec![line.to_string()],
        })
    }

    fn transfer_channel(&self) -> &FakeChannel {
        &self.channel
    }

    async fn disconnect(self) {
        self.log.push("disconnect");
    }
}

pub struct FakeChannel {
    log: EventLog,
    root: PathBuf,
}

impl TransferChannel for FakeChannel {
    async fn put(&self, local: &Path, remote: &str) -> Result<()> {
        self.log.push(format!("put:{remote}"));
        std::fs::copy(local, self.root.join(remote)).map_err(|e| TransferError::Failed {
            path: remote.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn get(&self, remote: &str, local: &Path) -> Result<()> {
        self.log.push(format!("get:{remote}"));
        std::fs::copy(self.root.join(remote), local)?;
        Ok(())
    }

    async fn mkdir(&self, remote: &str) -> Result<()> {
        self.log.push(format!("mkdir:{remote}"));
        let path = self.root.join(remote);
        if path.exists() {
            return Err(TransferError::AlreadyExists(remote.to_string()).into());
        }
        std::fs::create_dir(path)?;
        Ok(())
    }

    async fn list(&self, remote: &str) -> Result<Vec<DirectoryEntry>> {
        self.log.push(format!("list:{remote}"));
        let dir = std::fs::read_dir(self.root.join(remote)).map_err(|e| TransferError::Failed {
            path: remote.to_string(),
            reason: e.to_string(),
        })?;
        let mut entries = Vec::new();
        for entry in dir {
            let entry = entry?;
            let kind = if entry.file_type()?.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

// ── State store ──────────────────────────────────────────────────────────────

/// In-memory store keeping every saved snapshot.
#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<Vec<ProvisioningState>>,
}

impl MemoryStore {
    pub fn snapshots(&self) -> Vec<ProvisioningState> {
        self.saved.lock().expect("mutex poisoned").clone()
    }

    pub fn last(&self) -> Option<ProvisioningState> {
        self.snapshots().pop()
    }
}

impl StateStore for MemoryStore {
    async fn load(&self) -> Result<Option<ProvisioningState>> {
        Ok(self.last())
    }

    async fn save(&self, state: &ProvisioningState) -> Result<()> {
        self.saved.lock().expect("mutex poisoned").push(state.clone());
        Ok(())
    }
}

// ── Reporter ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingReporter {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("mutex poisoned").clone()
    }

    fn record(&self, kind: &str, message: &str) {
        self.messages
            .lock()
            .expect("mutex poisoned")
            .push(format!("{kind}: {message}"));
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.record("step", message);
    }
    fn success(&self, message: &str) {
        self.record("success", message);
    }
    fn warn(&self, message: &str) {
        self.record("warn", message);
    }
    fn detail(&self, line: &str) {
        self.record("detail", line);
    }
}

// ── Command runner ───────────────────────────────────────────────────────────

/// A `CommandRunner` that records every `(program, args)` call and replays
/// canned results.
#[derive(Clone)]
pub struct MockCommandRunner {
    /// All recorded `(program, args)` pairs in call order.
    pub calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    /// Results for `run` / `run_with_timeout`, consumed front to back.
    /// An exhausted queue yields a successful empty output.
    pub outputs: Arc<Mutex<VecDeque<Output>>>,
    /// Lines and exit code produced by `run_streaming`.
    pub stream: Arc<Mutex<(Vec<String>, i32)>>,
    /// Exit code returned by `run_status`.
    pub status_code: Arc<Mutex<i32>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            outputs: Arc::new(Mutex::new(VecDeque::new())),
            stream: Arc::new(Mutex::new((Vec::new(), 0))),
            status_code: Arc::new(Mutex::new(0)),
        }
    }

    pub fn push_output(&self, out: Output) {
        self.outputs.lock().expect("mutex poisoned").push_back(out);
    }

    pub fn set_stream(&self, lines: &[&str], code: i32) {
        *self.stream.lock().expect("mutex poisoned") =
            (lines.iter().map(|l| (*l).to_string()).collect(), code);
    }

    pub fn set_status(&self, code: i32) {
        *self.status_code.lock().expect("mutex poisoned") = code;
    }

    /// Return a snapshot of all recorded calls.
    pub fn recorded_calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().expect("mutex poisoned").clone()
    }

    fn record(&self, program: &str, args: &[&str]) {
        self.calls.lock().expect("mutex poisoned").push((
            program.to_owned(),
            args.iter().map(|s| (*s).to_string()).collect(),
        ));
    }
}

impl CommandRunner for MockCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.record(program, args);
        Ok(self
            .outputs
            .lock()
            .expect("mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| output(0, "", "")))
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> Result<Output> {
        self.run(program, args).await
    }

    async fn run_streaming(
        &self,
        program: &str,
        args: &[&str],
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ExitStatus> {
        self.record(program, args);
        let (lines, code) = self.stream.lock().expect("mutex poisoned").clone();
        for line in &lines {
            on_line(line);
        }
        Ok(exit_status(code))
    }

    async fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus> {
        self.record(program, args);
        Ok(exit_status(*self.status_code.lock().expect("mutex poisoned")))
    }
}
