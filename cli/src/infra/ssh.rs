//! OpenSSH-backed implementation of the remote session ports.
//!
//! A session is an OpenSSH control master started in the background; every
//! command and `scp` transfer of that session multiplexes over its control
//! socket. All processes go through a [`CommandRunner`] so tests can record
//! the exact argument lists.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::application::ports::{
    CommandOutcome, CommandRunner, RemoteConnector, RemoteSession, SessionTarget, TransferChannel,
};
use crate::domain::TransferError;
use crate::domain::remote::{DirectoryEntry, listing_command, parse_listing, shell_quote};

/// `scp` of a single file; mods and caches can be large.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);

/// Exit code `ssh` uses for its own failures.
const SSH_ERROR_STATUS: i32 = 255;

/// Authentication and host-key options shared by every invocation.
fn auth_options(target: &SessionTarget) -> Vec<String> {
    vec![
        "-i".into(),
        target.identity_file.display().to_string(),
        "-o".into(),
        "IdentitiesOnly=yes".into(),
        "-o".into(),
        format!("UserKnownHostsFile={}", target.known_hosts.display()),
        "-o".into(),
        "StrictHostKeyChecking=accept-new".into(),
        "-o".into(),
        "ConnectTimeout=10".into(),
    ]
}

fn destination(target: &SessionTarget) -> String {
    format!("{}@{}", target.user, target.address)
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Opens control-master sessions and interactive terminals.
pub struct SshConnector<R: CommandRunner + Clone> {
    runner: R,
}

impl<R: CommandRunner + Clone> SshConnector<R> {
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner + Clone> RemoteConnector for SshConnector<R> {
    type Session = SshSession<R>;

    async fn connect(&self, target: &SessionTarget) -> Result<SshSession<R>> {
        let control_dir = tempfile::Builder::new()
            .prefix("gamehost-ssh")
            .tempdir()
            .context("creating ssh control directory")?;
        let control_path = control_dir.path().join("ctl");
        let log_path = control_dir.path().join("master.log");

        let mut options = auth_options(target);
        options.extend([
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            format!("ControlPath={}", control_path.display()),
        ]);
        let destination = destination(target);

        let log = log_path.display().to_string();
        let mut args: Vec<&str> = vec!["-fN", "-o", "ControlMaster=yes", "-E", log.as_str()];
        args.extend(options.iter().map(String::as_str));
        args.push(&destination);

        tracing::debug!(%destination, "starting ssh control master");
        // The backgrounded master keeps any inherited pipes open, so only the
        // exit status of the foreground process is awaited.
        let status = self
            .runner
            .run_status("ssh", &args)
            .await
            .with_context(|| format!("connecting to {destination}"))?;
        if !status.success() {
            let log = tokio::fs::read_to_string(&log_path)
                .await
                .unwrap_or_default();
            anyhow::bail!("ssh connection to {destination} failed: {}", log.trim());
        }

        Ok(SshSession {
            channel: ScpChannel {
                runner: self.runner.clone(),
                destination,
                options,
            },
            control_path,
            _control_dir: control_dir,
        })
    }

    async fn attach(&self, target: &SessionTarget, command: Option<&str>) -> Result<ExitStatus> {
        let options = auth_options(target);
        let destination = destination(target);
        let mut args: Vec<&str> = options.iter().map(String::as_str).collect();
        if command.is_some() {
            args.push("-t");
        }
        args.push(&destination);
        if let Some(command) = command {
            args.push("--");
            args.push(command);
        }
        self.runner.run_status("ssh", &args).await
    }
}

/// One control-master session. The socket directory is removed on drop.
pub struct SshSession<R: CommandRunner> {
    channel: ScpChannel<R>,
    control_path: PathBuf,
    _control_dir: TempDir,
}

impl<R: CommandRunner> SshSession<R> {
    #[must_use]
    pub fn control_path(&self) -> &Path {
        &self.control_path
    }
}

impl<R: CommandRunner> RemoteSession for SshSession<R> {
    type Channel = ScpChannel<R>;

    async fn run(&self, command: &str, on_line: &mut dyn FnMut(&str)) -> Result<CommandOutcome> {
        let channel = &self.channel;
        let mut lines = Vec::new();
        let args = channel.ssh_args(command);
        let status = channel
            .runner
            .run_streaming("ssh", &args, &mut |line| {
                on_line(line);
                lines.push(line.to_string());
            })
            .await
            .with_context(|| format!("running remote command on {}", channel.destination))?;
        if status.code() == Some(SSH_ERROR_STATUS) {
            anyhow::bail!("ssh connection to {} was lost", channel.destination);
        }
        Ok(CommandOutcome {
            status: status.code(),
            lines,
        })
    }

    fn transfer_channel(&self) -> &ScpChannel<R> {
        &self.channel
    }

    async fn disconnect(self) {
        let channel = &self.channel;
        let control = format!("ControlPath={}", self.control_path.display());
        let args: [&str; 5] = ["-o", &control, "-O", "exit", &channel.destination];
        match channel.runner.run("ssh", &args).await {
            Ok(out) if out.status.success() => {
                tracing::debug!(destination = %channel.destination, "ssh session closed");
            }
            Ok(out) => tracing::warn!(stderr = %stderr_text(&out), "closing ssh session failed"),
            Err(e) => tracing::warn!(error = %e, "closing ssh session failed"),
        }
    }
}

/// `scp` and `ssh` file operations over a session's control socket.
pub struct ScpChannel<R: CommandRunner> {
    runner: R,
    destination: String,
    options: Vec<String>,
}

impl<R: CommandRunner> ScpChannel<R> {
    fn ssh_args<'a>(&'a self, command: &'a str) -> Vec<&'a str> {
        let mut args: Vec<&str> = self.options.iter().map(String::as_str).collect();
        args.extend([self.destination.as_str(), "--", command]);
        args
    }

    fn remote_spec(&self, path: &str) -> String {
        format!("{}:{path}", self.destination)
    }

    async fn scp(&self, from: &str, to: &str, path: &str) -> Result<()> {
        let mut args: Vec<&str> = vec!["-q"];
        args.extend(self.options.iter().map(String::as_str));
        args.extend([from, to]);
        let out = self
            .runner
            .run_with_timeout("scp", &args, TRANSFER_TIMEOUT)
            .await?;
        if !out.status.success() {
            return Err(TransferError::Failed {
                path: path.to_string(),
                reason: stderr_text(&out),
            }
            .into());
        }
        Ok(())
    }

    async fn remote_output(&self, command: &str) -> Result<Output> {
        self.runner.run("ssh", &self.ssh_args(command)).await
    }
}

impl<R: CommandRunner> TransferChannel for ScpChannel<R> {
    async fn put(&self, local: &Path, remote: &str) -> Result<()> {
        let local = local.display().to_string();
        self.scp(&local, &self.remote_spec(remote), remote).await
    }

    async fn get(&self, remote: &str, local: &Path) -> Result<()> {
        let local = local.display().to_string();
        self.scp(&self.remote_spec(remote), &local, remote).await
    }

    async fn mkdir(&self, remote: &str) -> Result<()> {
        let out = self
            .remote_output(&format!("mkdir {}", shell_quote(remote)))
            .await?;
        if out.status.success() {
            return Ok(());
        }
        let reason = stderr_text(&out);
        if reason.contains("File exists") {
            return Err(TransferError::AlreadyExists(remote.to_string()).into());
        }
        Err(TransferError::Failed {
            path: remote.to_string(),
            reason,
        }
        .into())
    }

    async fn list(&self, remote: &str) -> Result<Vec<DirectoryEntry>> {
        let out = self.remote_output(&listing_command(remote)).await?;
        if !out.status.success() {
            return Err(TransferError::Failed {
                path: remote.to_string(),
                reason: stderr_text(&out),
            }
            .into());
        }
        Ok(parse_listing(&String::from_utf8_lossy(&out.stdout)))
    }
}
