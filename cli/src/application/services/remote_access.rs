//! Interactive access to a running deployment: logs, shell, live console.

use std::path::Path;
use std::process::ExitStatus;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, RemoteConnector, SessionTarget};
use crate::domain::config::{DeployConfig, console_access};
use crate::domain::console::{CONSOLE_CONFIG_FILE, render_console_config};
use crate::domain::remote::shell_quote;

/// Remote command streaming the logs of compose service `service`.
#[must_use]
pub fn logs_command(service: &str) -> String {
    format!("docker-compose logs -f {} 2>&1", shell_quote(service))
}

/// Stream the application's logs until the operator interrupts.
///
/// # Errors
///
/// Returns an error if the session cannot be started.
pub async fn follow_logs(
    connector: &impl RemoteConnector,
    target: &SessionTarget,
    service: &str,
) -> Result<ExitStatus> {
    connector
        .attach(target, Some(&logs_command(service)))
        .await
        .context("following application logs")
}

/// Open an interactive login shell on the instance.
///
/// # Errors
///
/// Returns an error if the session cannot be started.
pub async fn open_shell(
    connector: &impl RemoteConnector,
    target: &SessionTarget,
) -> Result<ExitStatus> {
    connector
        .attach(target, None)
        .await
        .context("opening remote shell")
}

/// Launch the console web interface against the server at `host`.
///
/// The console toggles are checked before anything is written. The
/// configuration file lives in `scratch` and is passed as the last argument.
///
/// # Errors
///
/// Returns `ConfigError::ConsoleDisabled` if a toggle is unset, or an error
/// if the program cannot be started.
pub async fn launch_console(
    runner: &impl CommandRunner,
    config: &DeployConfig,
    host: &str,
    scratch: &Path,
) -> Result<ExitStatus> {
    let access = console_access(config)?;
    let (program, args) = config
        .console
        .program
        .split_first()
        .context("console.program is empty")?;

    let path = scratch.join(CONSOLE_CONFIG_FILE);
    tokio::fs::write(&path, render_console_config(host, &access)?)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    let path = path.to_string_lossy();
    let mut argv: Vec<&str> = args.iter().map(String::as_str).collect();
    argv.push(&path);
    tracing::info!(program = %program, ?argv, "starting console");
    runner
        .run_status(program, &argv)
        .await
        .with_context(|| format!("running {program}"))
}
