//! Executable resolution.
//!
//! Deterministic and side-effect-free: every probe is a read-only
//! filesystem check. Home-directory markers are expanded first; absolute
//! paths are probed directly; bare command names go through the platform
//! search path (`which` handles the PATH split and, on Windows, the
//! PATHEXT extension list).

use std::path::{Path, PathBuf};

/// Resolve a command string to an absolute executable path.
///
/// Returns `None` when nothing on the system matches.
#[must_use]
pub fn resolve_executable(command: &str) -> Option<PathBuf> {
    let expanded = expand_home(command);

    if expanded.is_absolute() {
        return is_executable(&expanded).then_some(expanded);
    }

    which::which(expanded).ok()
}

/// Expand a leading `~` or `~/` against the user's home directory.
fn expand_home(command: &str) -> PathBuf {
    if command == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(command));
    }
    if let Some(rest) = command
        .strip_prefix("~/")
        .or_else(|| command.strip_prefix("~\\"))
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(command)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
