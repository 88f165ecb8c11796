//! Include-directory collection for compiler invocations.

use std::path::{Path, PathBuf};

/// Conventional name of a project-local header directory.
const INCLUDE_DIR_NAME: &str = "include";

/// Assemble the `-I` directory list for a source file, in order: the
/// file's own directory, a project-local `include/` directory discovered
/// by walking upward (stopping at a `.git` boundary), then the configured
/// paths. Duplicates keep their first position.
#[must_use]
pub fn collect_include_dirs(source: &Path, configured: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Some(parent) = source.parent()
        && !parent.as_os_str().is_empty()
    {
        dirs.push(parent.to_path_buf());
    }
    if let Some(found) = discover_include_dir(source) {
        dirs.push(found);
    }
    dirs.extend(configured.iter().cloned());

    dedup_in_order(dirs)
}

fn discover_include_dir(source: &Path) -> Option<PathBuf> {
    let mut dir = source.parent();
    while let Some(current) = dir {
        let candidate = current.join(INCLUDE_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if current.join(".git").exists() {
            return None;
        }
        dir = current.parent();
    }
    None
}

fn dedup_in_order(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    dirs.into_iter().filter(|d| seen.insert(d.clone())).collect()
}
