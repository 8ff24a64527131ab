//! Application context: unified state passed to every command handler.
//!
//! `AppContext` owns the loaded configuration and the production adapters
//! for every port, so command handlers take one `&AppContext` and nothing
//! else.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::application::RetryWaiter;
use crate::application::services::provisioning::{ProvisioningWorkflow, session_target};
use crate::application::ports::SessionTarget;
use crate::domain::{DeployConfig, ProvisioningState};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::{check_local_layout, load_config};
use crate::infra::digitalocean::DigitalOceanClient;
use crate::infra::keys::SshKeygen;
use crate::infra::ssh::SshConnector;
use crate::infra::state::JsonStateStore;
use crate::output::{OutputContext, TerminalReporter};

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by the `CI` env var).
    pub yes: bool,
}

/// Locations of the configuration and state files.
pub struct PathFlags {
    pub config_file: PathBuf,
    pub state_file: PathBuf,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub behaviour: BehaviourFlags,
    pub paths: PathFlags,
}

/// The workflow wired to the production adapters.
pub type ProductionWorkflow<'a> = ProvisioningWorkflow<
    'a,
    DigitalOceanClient,
    SshKeygen<TokioCommandRunner>,
    SshConnector<TokioCommandRunner>,
    JsonStateStore,
    TerminalReporter<'a>,
>;

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Validated deployment configuration.
    pub config: DeployConfig,
    /// Directory the `layout` paths resolve against: the config file's
    /// directory.
    pub root: PathBuf,
    pub runner: TokioCommandRunner,
    pub provider: DigitalOceanClient,
    pub keys: SshKeygen<TokioCommandRunner>,
    pub connector: SshConnector<TokioCommandRunner>,
    pub state_store: JsonStateStore,
    /// When `true`, skip interactive prompts and use defaults.
    pub non_interactive: bool,
}

impl AppContext {
    /// Load and validate the configuration and build every adapter.
    ///
    /// No network or remote action happens here.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file is missing or invalid.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let non_interactive = flags.behaviour.yes || std::env::var("CI").is_ok();

        let config = load_config(&flags.paths.config_file)?;
        let root = config_root(&flags.paths.config_file);
        let runner = TokioCommandRunner::default();

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            provider: DigitalOceanClient::new(&config.provider),
            keys: SshKeygen::new(runner),
            connector: SshConnector::new(runner),
            runner,
            state_store: JsonStateStore::new(flags.paths.state_file.clone()),
            config,
            root,
            non_interactive,
        })
    }

    /// Check the local content directories the upload steps read.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first missing directory.
    pub fn check_local_layout(&self) -> Result<()> {
        check_local_layout(&self.config, &self.root)
    }

    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    #[must_use]
    pub fn workflow<'a>(&'a self, reporter: &'a TerminalReporter<'a>) -> ProductionWorkflow<'a> {
        ProvisioningWorkflow {
            provider: &self.provider,
            keys: &self.keys,
            connector: &self.connector,
            store: &self.state_store,
            reporter,
            config: &self.config,
            root: &self.root,
            waiter: RetryWaiter::default(),
        }
    }

    /// Session parameters for the deployed instance.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing has been deployed yet.
    pub fn session_target(&self, state: &ProvisioningState) -> Result<SessionTarget> {
        session_target(&self.root, &self.config.layout, state)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI or `--yes`), returns `default`
    /// immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}

fn config_root(config_file: &Path) -> PathBuf {
    match config_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
