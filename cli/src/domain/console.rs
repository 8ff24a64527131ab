//! Configuration document for the remote console web interface.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::config::ConsoleAccess;

/// Section name the console interface lists the server under.
pub const CONSOLE_SERVER_NAME: &str = "my-server";

/// File name of the rendered console configuration.
pub const CONSOLE_CONFIG_FILE: &str = "console.toml";

#[derive(Debug, Serialize)]
struct ServerEntry<'a> {
    host: &'a str,
    port: u16,
    rcon_password: &'a str,
}

/// Render the console configuration for one server at `host`.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn render_console_config(host: &str, access: &ConsoleAccess) -> Result<String> {
    let mut servers = BTreeMap::new();
    servers.insert(
        CONSOLE_SERVER_NAME,
        ServerEntry {
            host,
            port: access.port,
            rcon_password: &access.password,
        },
    );
    toml::to_string(&servers).context("serializing console configuration")
}
