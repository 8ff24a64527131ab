//! Remote filesystem and shell helpers.
//!
//! Pure parsing and formatting used by the transfer channel and the
//! directory mirror. No I/O.

/// Kind of an entry in a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One node of a local or remote tree being mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirectoryEntry {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Join a remote directory and an entry name with `/`.
#[must_use]
pub fn remote_join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        return name.to_string();
    }
    format!("{}/{name}", dir.trim_end_matches('/'))
}

/// Last component of a local layout path, used as the remote name.
#[must_use]
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Quote `arg` for a POSIX shell.
#[must_use]
pub fn shell_quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@+,".contains(c))
    {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Remote command that lists `dir` one entry per line as `<type>\t<name>`.
#[must_use]
pub fn listing_command(dir: &str) -> String {
    format!(
        "find {} -mindepth 1 -maxdepth 1 -printf '%y\\t%f\\n'",
        shell_quote(dir)
    )
}

/// Parse the output of [`listing_command`].
///
/// `d` marks a directory; every other type (regular file, symlink) is
/// transferred as a file. Blank or malformed lines are skipped.
#[must_use]
pub fn parse_listing(output: &str) -> Vec<DirectoryEntry> {
    output
        .lines()
        .filter_map(|line| {
            let (kind, name) = line.split_once('\t')?;
            if name.is_empty() || name == "." || name == ".." {
                return None;
            }
            let kind = if kind == "d" {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            Some(DirectoryEntry {
                name: name.to_string(),
                kind,
            })
        })
        .collect()
}
