//! Layered settings resolution.
//!
//! Precedence, least to most specific: built-in defaults, the discovered
//! `cragproject.json`, the live client-pushed configuration, CLI overrides.
//! Each layer is a [`SettingsOverlay`]; [`SettingsResolver`] folds them in
//! order and caches the resolved snapshot per document.
//!
//! Project-file parse failures are reported once per path and are never
//! fatal — the remaining layers still apply.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crag_types::{Settings, SettingsOverlay};

/// File name looked up by the upward project-file search.
pub const PROJECT_FILE_NAME: &str = "cragproject.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Walk upward from `start` looking for [`PROJECT_FILE_NAME`], stopping
/// after the first directory that contains a `.git` entry (the repository
/// boundary) or at the filesystem root.
#[must_use]
pub fn discover_project_file(start: &Path) -> Option<PathBuf> {
    let mut dir = if start.is_dir() {
        Some(start)
    } else {
        start.parent()
    };

    while let Some(current) = dir {
        let candidate = current.join(PROJECT_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if current.join(".git").exists() {
            return None;
        }
        dir = current.parent();
    }
    None
}

/// Read and parse a project file into an overlay.
///
/// Relative paths inside the file (include paths, compile-commands dir)
/// resolve against the file's own directory.
pub fn load_project_file(path: &Path) -> Result<SettingsOverlay, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut overlay: SettingsOverlay =
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if let Some(base) = path.parent() {
        anchor_relative_paths(&mut overlay, base);
    }
    Ok(overlay)
}

fn anchor_relative_paths(overlay: &mut SettingsOverlay, base: &Path) {
    if let Some(compiler) = &mut overlay.compiler {
        if let Some(paths) = &mut compiler.include_paths {
            for p in paths.iter_mut() {
                if p.is_relative() {
                    *p = base.join(&*p);
                }
            }
        }
        if let Some(home) = &mut compiler.home
            && home.is_relative()
        {
            *home = base.join(&*home);
        }
    }
    if let Some(analyzer) = &mut overlay.analyzer
        && let Some(dir) = &mut analyzer.compile_commands_dir
        && dir.is_relative()
    {
        *dir = base.join(&*dir);
    }
}

/// Folds the settings layers and caches resolved snapshots per document.
///
/// Not internally synchronized — the owner serializes access (the server
/// keeps it behind its session lock, the CLI is single-shot).
#[derive(Debug, Default)]
pub struct SettingsResolver {
    client_overlay: Option<SettingsOverlay>,
    cli_overlay: Option<SettingsOverlay>,
    cache: HashMap<PathBuf, Settings>,
    warned_paths: HashSet<PathBuf>,
}

impl SettingsResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the live client configuration layer and drop all cached
    /// snapshots.
    pub fn set_client_overlay(&mut self, overlay: Option<SettingsOverlay>) {
        self.client_overlay = overlay;
        self.invalidate();
    }

    /// Install the CLI layer (most specific; set once at startup).
    pub fn set_cli_overlay(&mut self, overlay: SettingsOverlay) {
        self.cli_overlay = Some(overlay);
        self.invalidate();
    }

    /// Drop every cached snapshot; the next lookup re-resolves.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Resolve the settings snapshot for a document, consulting the cache.
    pub fn settings_for(&mut self, document: &Path) -> Settings {
        if let Some(cached) = self.cache.get(document) {
            return cached.clone();
        }
        let resolved = self.resolve(document);
        self.cache.insert(document.to_path_buf(), resolved.clone());
        resolved
    }

    fn resolve(&mut self, document: &Path) -> Settings {
        let mut settings = Settings::default();

        if let Some(project_path) = discover_project_file(document) {
            match load_project_file(&project_path) {
                Ok(overlay) => settings = settings.merged(&overlay),
                Err(e) => {
                    if self.warned_paths.insert(project_path.clone()) {
                        tracing::warn!("ignoring project config: {e}");
                    }
                }
            }
        }
        if let Some(overlay) = &self.client_overlay {
            settings = settings.merged(overlay);
        }
        if let Some(overlay) = &self.cli_overlay {
            settings = settings.merged(overlay);
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_project(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join(PROJECT_FILE_NAME);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn discovers_in_parent_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();
        let expected = write_project(tmp.path(), "{}");

        let doc = nested.join("game.crag");
        fs::write(&doc, "").unwrap();
        assert_eq!(discover_project_file(&doc), Some(expected));
    }

    #[test]
    fn search_stops_at_repository_boundary() {
        let tmp = tempfile::tempdir().unwrap();
        write_project(tmp.path(), "{}");
        let repo = tmp.path().join("repo");
        let nested = repo.join("src");
        fs::create_dir_all(repo.join(".git")).unwrap();
        fs::create_dir_all(&nested).unwrap();

        // Config file above the .git boundary must not be found.
        let doc = nested.join("game.crag");
        fs::write(&doc, "").unwrap();
        assert_eq!(discover_project_file(&doc), None);
    }

    #[test]
    fn boundary_directory_itself_is_searched() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        let expected = write_project(tmp.path(), "{}");

        let doc = tmp.path().join("game.crag");
        fs::write(&doc, "").unwrap();
        assert_eq!(discover_project_file(&doc), Some(expected));
    }

    #[test]
    fn relative_paths_anchor_to_project_file_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_project(
            tmp.path(),
            r#"{
                "compiler": { "includePaths": ["include", "/abs"] },
                "analyzer": { "compileCommandsDir": "build" }
            }"#,
        );

        let overlay = load_project_file(&path).unwrap();
        let compiler = overlay.compiler.unwrap();
        assert_eq!(
            compiler.include_paths.unwrap(),
            vec![tmp.path().join("include"), PathBuf::from("/abs")]
        );
        assert_eq!(
            overlay.analyzer.unwrap().compile_commands_dir.unwrap(),
            tmp.path().join("build")
        );
    }

    #[test]
    fn parse_failure_is_reported_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        write_project(tmp.path(), "{ not json");
        let doc = tmp.path().join("game.crag");
        fs::write(&doc, "").unwrap();

        let mut resolver = SettingsResolver::new();
        let settings = resolver.settings_for(&doc);
        // Falls back to defaults
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn layers_fold_in_precedence_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_project(
            tmp.path(),
            r#"{ "compiler": { "path": "from-project" }, "maxNumberOfProblems": 7 }"#,
        );
        let doc = tmp.path().join("game.crag");
        fs::write(&doc, "").unwrap();

        let mut resolver = SettingsResolver::new();
        resolver.set_client_overlay(Some(
            serde_json::from_value(serde_json::json!({
                "compiler": { "path": "from-client" }
            }))
            .unwrap(),
        ));
        resolver.set_cli_overlay(
            serde_json::from_value(serde_json::json!({
                "analyzer": { "enabled": true }
            }))
            .unwrap(),
        );

        let settings = resolver.settings_for(&doc);
        assert_eq!(settings.compiler.path, "from-client");
        assert_eq!(settings.max_problems.0, 7);
        assert!(settings.analyzer.enabled);
    }

    #[test]
    fn cache_is_invalidated_on_client_change() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = tmp.path().join("game.crag");
        fs::write(&doc, "").unwrap();

        let mut resolver = SettingsResolver::new();
        assert_eq!(resolver.settings_for(&doc).compiler.path, "cragc");

        resolver.set_client_overlay(Some(
            serde_json::from_value(serde_json::json!({
                "compiler": { "path": "pushed" }
            }))
            .unwrap(),
        ));
        assert_eq!(resolver.settings_for(&doc).compiler.path, "pushed");
    }

    #[test]
    fn missing_project_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        let doc = tmp.path().join("game.crag");
        fs::write(&doc, "").unwrap();

        let mut resolver = SettingsResolver::new();
        assert_eq!(resolver.settings_for(&doc), Settings::default());
    }
}
