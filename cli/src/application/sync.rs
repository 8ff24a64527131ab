//! Recursive directory mirroring over a transfer channel.
//!
//! Mirrors are one-directional and not transactional: the first failing
//! transfer aborts the walk and is returned, leaving whatever was already
//! copied in place. Re-running overwrites files and skips existing
//! directories, so repeating a mirror is always safe.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::TransferChannel;
use crate::domain::TransferError;
use crate::domain::remote::remote_join;

/// Create `remote` unless it already exists.
///
/// # Errors
///
/// Propagates every channel failure other than `TransferError::AlreadyExists`.
pub async fn ensure_remote_dir(channel: &impl TransferChannel, remote: &str) -> Result<()> {
    match channel.mkdir(remote).await {
        Ok(()) => Ok(()),
        Err(e) if is_already_exists(&e) => {
            tracing::debug!(path = remote, "remote directory already exists");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn is_already_exists(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<TransferError>(),
        Some(TransferError::AlreadyExists(_))
    )
}

/// Upload the contents of `local_dir` into `remote_dir`.
///
/// `remote_dir` itself must exist; subdirectories are created as needed.
///
/// # Errors
///
/// Returns the first local read or remote transfer failure.
pub async fn mirror_up(
    channel: &impl TransferChannel,
    local_dir: &Path,
    remote_dir: &str,
) -> Result<()> {
    let mut entries = tokio::fs::read_dir(local_dir)
        .await
        .with_context(|| format!("reading directory {}", local_dir.display()))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("reading directory {}", local_dir.display()))?
    {
        let path = entry.path();
        let name = entry
            .file_name()
            .into_string()
            .map_err(|n| anyhow::anyhow!("file name {n:?} is not valid UTF-8"))?;
        let remote = remote_join(remote_dir, &name);
        let metadata = tokio::fs::metadata(&path)
            .await
            .with_context(|| format!("reading metadata of {}", path.display()))?;
        if metadata.is_dir() {
            ensure_remote_dir(channel, &remote)
                .await
                .with_context(|| format!("creating remote directory {remote}"))?;
            Box::pin(mirror_up(channel, &path, &remote)).await?;
        } else {
            tracing::debug!(local = %path.display(), remote, "uploading");
            channel
                .put(&path, &remote)
                .await
                .with_context(|| format!("uploading {}", path.display()))?;
        }
    }
    Ok(())
}

/// Download the contents of `remote_dir` into `local_dir`, creating
/// `local_dir` and any intermediate directories first.
///
/// # Errors
///
/// Returns the first remote listing, transfer or local write failure.
pub async fn mirror_down(
    channel: &impl TransferChannel,
    remote_dir: &str,
    local_dir: &Path,
) -> Result<()> {
    tokio::fs::create_dir_all(local_dir)
        .await
        .with_context(|| format!("creating directory {}", local_dir.display()))?;
    let entries = channel
        .list(remote_dir)
        .await
        .with_context(|| format!("listing remote directory {remote_dir}"))?;
    for entry in entries {
        let remote = remote_join(remote_dir, &entry.name);
        let local = local_dir.join(&entry.name);
        if entry.is_dir() {
            Box::pin(mirror_down(channel, &remote, &local)).await?;
        } else {
            tracing::debug!(remote, local = %local.display(), "downloading");
            channel
                .get(&remote, &local)
                .await
                .with_context(|| format!("downloading {remote}"))?;
        }
    }
    Ok(())
}
