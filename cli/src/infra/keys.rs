//! Access key pairs generated with `ssh-keygen`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, KeyGenerator};

/// `KeyGenerator` backed by the OpenSSH `ssh-keygen` binary.
pub struct SshKeygen<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> SshKeygen<R> {
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

fn public_key_path(private_key: &Path) -> PathBuf {
    let mut name = private_key.as_os_str().to_owned();
    name.push(".pub");
    PathBuf::from(name)
}

impl<R: CommandRunner> KeyGenerator for SshKeygen<R> {
    async fn generate(&self, private_key: &Path, comment: &str) -> Result<String> {
        let path = private_key.display().to_string();
        let out = self
            .runner
            .run(
                "ssh-keygen",
                &["-t", "ed25519", "-N", "", "-C", comment, "-f", &path, "-q"],
            )
            .await
            .context("running ssh-keygen")?;
        anyhow::ensure!(
            out.status.success(),
            "ssh-keygen failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        );
        let public = public_key_path(private_key);
        let key = tokio::fs::read_to_string(&public)
            .await
            .with_context(|| format!("reading {}", public.display()))?;
        Ok(key.trim().to_string())
    }

    async fn existing(&self, private_key: &Path) -> Result<Option<String>> {
        let public = public_key_path(private_key);
        if !private_key.exists() || !public.exists() {
            return Ok(None);
        }
        let key = tokio::fs::read_to_string(&public)
            .await
            .with_context(|| format!("reading {}", public.display()))?;
        Ok(Some(key.trim().to_string()))
    }
}
