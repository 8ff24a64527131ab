//! Argument lists the OpenSSH adapters hand to the command runner.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use gamehost_cli::application::ports::{
    KeyGenerator, RemoteConnector, RemoteSession, SessionTarget, TransferChannel,
};
use gamehost_cli::domain::{EntryKind, TransferError};
use gamehost_cli::infra::keys::SshKeygen;
use gamehost_cli::infra::ssh::SshConnector;

use crate::mocks::{MockCommandRunner, output};

fn target() -> SessionTarget {
    SessionTarget {
        address: "203.0.113.10".into(),
        user: "root".into(),
        identity_file: PathBuf::from("/work/ssh_keys/gamehost_0badc0de"),
        known_hosts: PathBuf::from("/work/ssh_keys/gamehost_0badc0de.known_hosts"),
    }
}

fn has_option(args: &[String], option: &str) -> bool {
    args.windows(2).any(|w| w[0] == "-o" && w[1] == option)
}

#[tokio::test]
async fn connect_starts_background_control_master() {
    let runner = MockCommandRunner::new();
    let connector = SshConnector::new(runner.clone());

    let session = connector.connect(&target()).await.expect("connect");

    let calls = runner.recorded_calls();
    assert_eq!(calls.len(), 1);
    let (program, args) = &calls[0];
    assert_eq!(program, "ssh");
    assert_eq!(&args[..3], ["-fN", "-o", "ControlMaster=yes"]);
    assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == "/work/ssh_keys/gamehost_0badc0de"));
    assert!(has_option(args, "BatchMode=yes"));
    assert!(has_option(args, "StrictHostKeyChecking=accept-new"));
    assert!(has_option(
        args,
        "UserKnownHostsFile=/work/ssh_keys/gamehost_0badc0de.known_hosts"
    ));
    assert!(has_option(
        args,
        &format!("ControlPath={}", session.control_path().display())
    ));
    assert_eq!(args.last().map(String::as_str), Some("root@203.0.113.10"));
}

#[tokio::test]
async fn connect_failure_is_reported() {
    let runner = MockCommandRunner::new();
    runner.set_status(255);
    let connector = SshConnector::new(runner.clone());

    let err = connector
        .connect(&target())
        .await
        .err()
        .expect("connect fails");
    assert!(
        err.to_string().contains("ssh connection to root@203.0.113.10 failed"),
        "{err:#}"
    );
}

#[tokio::test]
async fn run_streams_lines_over_control_socket() {
    let runner = MockCommandRunner::new();
    runner.set_stream(&["hello", "world"], 0);
    let connector = SshConnector::new(runner.clone());
    let session = connector.connect(&target()).await.expect("connect");

    let mut seen = Vec::new();
    let outcome = session
        .run("echo hello world", &mut |line| seen.push(line.to_string()))
        .await
        .expect("run");

    assert!(outcome.success());
    assert_eq!(outcome.lines, vec!["hello", "world"]);
    assert_eq!(seen, outcome.lines);
    let (program, args) = &runner.recorded_calls()[1];
    assert_eq!(program, "ssh");
    assert_eq!(
        &args[args.len() - 3..],
        ["root@203.0.113.10", "--", "echo hello world"]
    );
    assert!(has_option(args, "BatchMode=yes"));
}

#[tokio::test]
async fn run_reports_remote_exit_code() {
    let runner = MockCommandRunner::new();
    runner.set_stream(&["boom"], 3);
    let connector = SshConnector::new(runner.clone());
    let session = connector.connect(&target()).await.expect("connect");

    let outcome = session.run("false", &mut |_| {}).await.expect("run");
    assert!(!outcome.success());
    assert_eq!(outcome.code(), 3);
}

#[tokio::test]
async fn run_treats_ssh_failure_status_as_error() {
    let runner = MockCommandRunner::new();
    runner.set_stream(&[], 255);
    let connector = SshConnector::new(runner.clone());
    let session = connector.connect(&target()).await.expect("connect");

    let err = session
        .run("uptime", &mut |_| {})
        .await
        .expect_err("lost connection");
    assert!(err.to_string().contains("was lost"), "{err:#}");
}

#[tokio::test]
async fn put_and_get_use_quiet_scp() {
    let runner = MockCommandRunner::new();
    let connector = SshConnector::new(runner.clone());
    let session = connector.connect(&target()).await.expect("connect");
    let channel = session.transfer_channel();

    channel
        .put(Path::new("/work/Mods/a.as"), "Mods/a.as")
        .await
        .expect("put");
    channel
        .get("Cache/b.png", Path::new("/work/Cache/b.png"))
        .await
        .expect("get");

    let calls = runner.recorded_calls();
    let (program, args) = &calls[1];
    assert_eq!(program, "scp");
    assert_eq!(args[0], "-q");
    assert_eq!(
        &args[args.len() - 2..],
        ["/work/Mods/a.as", "root@203.0.113.10:Mods/a.as"]
    );
    let (_, args) = &calls[2];
    assert_eq!(
        &args[args.len() - 2..],
        ["root@203.0.113.10:Cache/b.png", "/work/Cache/b.png"]
    );
}

#[tokio::test]
async fn failed_scp_is_a_transfer_error() {
    let runner = MockCommandRunner::new();
    runner.push_output(output(1, "", "scp: Mods/a.as: No such file or directory"));
    let connector = SshConnector::new(runner.clone());
    let session = connector.connect(&target()).await.expect("connect");

    let err = session
        .transfer_channel()
        .put(Path::new("/work/Mods/a.as"), "Mods/a.as")
        .await
        .expect_err("scp fails");
    match err.downcast_ref::<TransferError>() {
        Some(TransferError::Failed { path, reason }) => {
            assert_eq!(path, "Mods/a.as");
            assert!(reason.contains("No such file"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn mkdir_of_existing_directory_is_distinguished() {
    let runner = MockCommandRunner::new();
    runner.push_output(output(1, "", "mkdir: cannot create directory 'Mods': File exists"));
    let connector = SshConnector::new(runner.clone());
    let session = connector.connect(&target()).await.expect("connect");

    let err = session
        .transfer_channel()
        .mkdir("Mods")
        .await
        .expect_err("exists");
    assert!(matches!(
        err.downcast_ref::<TransferError>(),
        Some(TransferError::AlreadyExists(p)) if p == "Mods"
    ));
    let (_, args) = &runner.recorded_calls()[1];
    assert_eq!(args.last().map(String::as_str), Some("mkdir Mods"));
}

#[tokio::test]
async fn list_parses_remote_listing() {
    let runner = MockCommandRunner::new();
    runner.push_output(output(0, "d\tmaps\nf\tarena.png\n", ""));
    let connector = SshConnector::new(runner.clone());
    let session = connector.connect(&target()).await.expect("connect");

    let entries = session.transfer_channel().list("Cache").await.expect("list");

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "maps");
    assert_eq!(entries[0].kind, EntryKind::Directory);
    assert_eq!(entries[1].name, "arena.png");
    assert_eq!(entries[1].kind, EntryKind::File);
    let (_, args) = &runner.recorded_calls()[1];
    assert!(args.last().expect("command").starts_with("find Cache "));
}

#[tokio::test]
async fn list_of_missing_directory_fails() {
    let runner = MockCommandRunner::new();
    runner.push_output(output(1, "", "find: 'Cache': No such file or directory"));
    let connector = SshConnector::new(runner.clone());
    let session = connector.connect(&target()).await.expect("connect");

    let err = session
        .transfer_channel()
        .list("Cache")
        .await
        .expect_err("missing");
    assert!(matches!(
        err.downcast_ref::<TransferError>(),
        Some(TransferError::Failed { .. })
    ));
}

#[tokio::test]
async fn disconnect_stops_control_master() {
    let runner = MockCommandRunner::new();
    let connector = SshConnector::new(runner.clone());
    let session = connector.connect(&target()).await.expect("connect");
    let control = format!("ControlPath={}", session.control_path().display());

    session.disconnect().await;

    let (program, args) = runner.recorded_calls().pop().expect("call");
    assert_eq!(program, "ssh");
    assert_eq!(args, ["-o", control.as_str(), "-O", "exit", "root@203.0.113.10"]);
}

#[tokio::test]
async fn attach_with_command_allocates_terminal() {
    let runner = MockCommandRunner::new();
    let connector = SshConnector::new(runner.clone());

    let status = connector
        .attach(&target(), Some("docker-compose logs -f kag 2>&1"))
        .await
        .expect("attach");

    assert!(status.success());
    let (_, args) = &runner.recorded_calls()[0];
    assert_eq!(
        &args[args.len() - 4..],
        ["-t", "root@203.0.113.10", "--", "docker-compose logs -f kag 2>&1"]
    );
    assert!(!has_option(args, "BatchMode=yes"));
}

#[tokio::test]
async fn attach_without_command_opens_login_shell() {
    let runner = MockCommandRunner::new();
    let connector = SshConnector::new(runner.clone());

    connector.attach(&target(), None).await.expect("attach");

    let (_, args) = &runner.recorded_calls()[0];
    assert_eq!(args.last().map(String::as_str), Some("root@203.0.113.10"));
    assert!(!args.iter().any(|a| a == "-t" || a == "--"));
}

#[tokio::test]
async fn keygen_generates_unencrypted_ed25519_pair() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let private = dir.path().join("gamehost_0badc0de");
    std::fs::write(
        dir.path().join("gamehost_0badc0de.pub"),
        "ssh-ed25519 AAAAC3Nza gamehost_0badc0de\n",
    )
    .expect("write pub");
    let runner = MockCommandRunner::new();
    let keygen = SshKeygen::new(runner.clone());

    let public = keygen
        .generate(&private, "gamehost_0badc0de")
        .await
        .expect("generate");

    assert_eq!(public, "ssh-ed25519 AAAAC3Nza gamehost_0badc0de");
    let (program, args) = &runner.recorded_calls()[0];
    assert_eq!(program, "ssh-keygen");
    assert_eq!(
        args,
        &[
            "-t",
            "ed25519",
            "-N",
            "",
            "-C",
            "gamehost_0badc0de",
            "-f",
            private.to_str().expect("utf-8"),
            "-q",
        ]
    );
}

#[tokio::test]
async fn keygen_existing_requires_both_halves() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let private = dir.path().join("gamehost_0badc0de");
    let keygen = SshKeygen::new(MockCommandRunner::new());

    std::fs::write(&private, "secret").expect("write");
    assert!(keygen.existing(&private).await.expect("existing").is_none());

    std::fs::write(dir.path().join("gamehost_0badc0de.pub"), "ssh-ed25519 AAAA x\n")
        .expect("write");
    assert_eq!(
        keygen.existing(&private).await.expect("existing").as_deref(),
        Some("ssh-ed25519 AAAA x")
    );
}
