//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags, PathFlags};
use crate::application::ports::StateStore;
use crate::commands;
use crate::domain::ProvisioningState;

/// Provision and run a game server on a cloud instance
#[derive(Parser)]
#[command(
    name = "gamehost",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Deployment configuration file
    #[arg(
        long,
        global = true,
        env = "GAMEHOST_CONFIG",
        default_value = "config.yaml"
    )]
    pub config_file: PathBuf,

    /// Provisioning state file
    #[arg(
        long,
        global = true,
        env = "GAMEHOST_STATE",
        default_value = "state.json"
    )]
    pub state_file: PathBuf,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Log diagnostic detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Create the server, or finish creating it, and deploy the game
    Up,

    /// Save the cache and destroy the server
    Down,

    /// Upload config and mods, then restart the game
    RestartApp,

    /// Stream the game server logs
    FollowLogs,

    /// Open a shell on the server
    Shell,

    /// Open the live console web interface
    Console,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// Configuration is loaded and validated before the state is read or any
    /// remote action is taken. The state is saved after the command whether
    /// it succeeded or not.
    ///
    /// # Errors
    ///
    /// Returns the command's error, or an error saving the state.
    pub async fn run(self) -> Result<()> {
        let Cli {
            config_file,
            state_file,
            quiet,
            no_color,
            verbose,
            yes,
            command,
        } = self;
        crate::logging::init_logging(verbose);

        let app = AppContext::new(&AppFlags {
            output: OutputFlags { no_color, quiet },
            behaviour: BehaviourFlags { yes },
            paths: PathFlags {
                config_file,
                state_file,
            },
        })?;

        let mut state = app
            .state_store
            .load()
            .await?
            .unwrap_or_else(ProvisioningState::fresh);
        state.begin_invocation();
        tracing::debug!(?command, ?state, "loaded state");

        let result = match command {
            Command::Up => commands::up::run(&app, &mut state).await,
            Command::Down => commands::down::run(&app, &mut state).await,
            Command::RestartApp => commands::restart_app::run(&app, &mut state).await,
            Command::FollowLogs => commands::follow_logs::run(&app, &state).await,
            Command::Shell => commands::shell::run(&app, &state).await,
            Command::Console => commands::console::run(&app, &state).await,
        };

        let saved = app
            .state_store
            .save(&state)
            .await
            .with_context(|| format!("saving {}", app.state_store.path().display()));
        result?;
        saved
    }
}
