//! Resolved configuration types and the layered merge.
//!
//! [`Settings`] is the fully-resolved snapshot every component reads; it is
//! never mutated in place. Partial layers (project file, live client
//! configuration, CLI flags) deserialize into [`SettingsOverlay`], an
//! all-`Option` mirror, and are folded onto a base with [`Settings::merged`].
//! The merge is left-biased per field: a present key in the overlay wins,
//! an absent key falls through to the base.

use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

/// Default cap on published diagnostics per document.
pub const DEFAULT_MAX_PROBLEMS: usize = 100;

/// How the analyzer participates in editor-facing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerMode {
    /// The analyzer owns semantics: delegate requests to it, local answers
    /// are only a fallback on delegation failure.
    Proxy,
    /// Merge analyzer answers with the local tag-based answers.
    Augment,
    /// Never consult the analyzer for requests.
    Disabled,
}

impl FromStr for AnalyzerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proxy" => Ok(Self::Proxy),
            "augment" => Ok(Self::Augment),
            "disabled" => Ok(Self::Disabled),
            other => Err(format!(
                "invalid analyzer mode '{other}' (expected proxy, augment, or disabled)"
            )),
        }
    }
}

/// Policy for analyzer-sourced diagnostics before publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticsMode {
    /// Pass everything through.
    All,
    /// Drop known-noise messages on lines using Crag dialect syntax.
    Filtered,
    /// Discard all analyzer diagnostics.
    None,
}

impl FromStr for DiagnosticsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "filtered" => Ok(Self::Filtered),
            "none" => Ok(Self::None),
            other => Err(format!(
                "invalid diagnostics mode '{other}' (expected all, filtered, or none)"
            )),
        }
    }
}

/// Compiler (`cragc`) settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerSettings {
    /// Configured command; resolved through the executable resolver and
    /// the `CRAG_HOME` candidate chain before spawning.
    pub path: String,
    pub enabled: bool,
    /// Crag installation root; overrides the `CRAG_HOME` environment
    /// variable when set.
    pub home: Option<PathBuf>,
    pub include_paths: Vec<PathBuf>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            path: "cragc".to_string(),
            enabled: true,
            home: None,
            include_paths: Vec::new(),
        }
    }
}

/// External analyzer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerSettings {
    pub enabled: bool,
    pub mode: AnalyzerMode,
    pub path: String,
    pub args: Vec<String>,
    pub compile_commands_dir: Option<PathBuf>,
    /// Compiler-style flags handed to the analyzer via
    /// `initializationOptions.fallbackFlags`.
    pub fallback_flags: Vec<String>,
    pub diagnostics_mode: DiagnosticsMode,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: AnalyzerMode::Augment,
            path: "clangd".to_string(),
            args: Vec::new(),
            compile_commands_dir: None,
            fallback_flags: Vec::new(),
            diagnostics_mode: DiagnosticsMode::Filtered,
        }
    }
}

/// When validation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerSettings {
    pub on_save: bool,
    pub on_type: bool,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            on_save: true,
            on_type: false,
        }
    }
}

/// A fully-resolved settings snapshot. Read-only downstream; a new snapshot
/// supersedes the old one atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub compiler: CompilerSettings,
    pub analyzer: AnalyzerSettings,
    pub triggers: TriggerSettings,
    pub max_problems: MaxProblems,
}

/// Newtype so `Default` can be the documented cap rather than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxProblems(pub usize);

impl Default for MaxProblems {
    fn default() -> Self {
        Self(DEFAULT_MAX_PROBLEMS)
    }
}

impl Settings {
    /// Fold an overlay onto this snapshot, producing a new snapshot.
    /// Present overlay fields win; absent fields fall through.
    #[must_use]
    pub fn merged(&self, overlay: &SettingsOverlay) -> Self {
        let mut out = self.clone();
        if let Some(compiler) = &overlay.compiler {
            if let Some(path) = &compiler.path {
                out.compiler.path = path.clone();
            }
            if let Some(enabled) = compiler.enabled {
                out.compiler.enabled = enabled;
            }
            if let Some(home) = &compiler.home {
                out.compiler.home = Some(home.clone());
            }
            if let Some(include_paths) = &compiler.include_paths {
                out.compiler.include_paths = include_paths.clone();
            }
        }
        if let Some(analyzer) = &overlay.analyzer {
            if let Some(enabled) = analyzer.enabled {
                out.analyzer.enabled = enabled;
            }
            if let Some(mode) = analyzer.mode {
                out.analyzer.mode = mode;
            }
            if let Some(path) = &analyzer.path {
                out.analyzer.path = path.clone();
            }
            if let Some(args) = &analyzer.args {
                out.analyzer.args = args.clone();
            }
            if let Some(dir) = &analyzer.compile_commands_dir {
                out.analyzer.compile_commands_dir = Some(dir.clone());
            }
            if let Some(flags) = &analyzer.fallback_flags {
                out.analyzer.fallback_flags = flags.clone();
            }
            if let Some(mode) = analyzer.diagnostics_mode {
                out.analyzer.diagnostics_mode = mode;
            }
        }
        if let Some(triggers) = &overlay.triggers {
            if let Some(on_save) = triggers.on_save {
                out.triggers.on_save = on_save;
            }
            if let Some(on_type) = triggers.on_type {
                out.triggers.on_type = on_type;
            }
        }
        if let Some(max) = overlay.max_problems {
            out.max_problems = MaxProblems(max);
        }
        out
    }

    /// Canonical key for the analyzer-relevant subset. Two snapshots with
    /// the same fingerprint may share a running analyzer session.
    #[must_use]
    pub fn analyzer_fingerprint(&self) -> String {
        let a = &self.analyzer;
        serde_json::json!({
            "enabled": a.enabled,
            "path": a.path,
            "args": a.args,
            "compileCommandsDir": a.compile_commands_dir,
            "fallbackFlags": a.fallback_flags,
        })
        .to_string()
    }
}

/// Partial settings layer: project file, client push, or CLI flags.
///
/// Every field is optional; deserialization accepts the same camelCase
/// shape the editor client pushes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsOverlay {
    pub compiler: Option<CompilerOverlay>,
    pub analyzer: Option<AnalyzerOverlay>,
    #[serde(alias = "validate")]
    pub triggers: Option<TriggerOverlay>,
    #[serde(alias = "maxNumberOfProblems")]
    pub max_problems: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompilerOverlay {
    pub path: Option<String>,
    #[serde(alias = "enable")]
    pub enabled: Option<bool>,
    #[serde(alias = "cragHome")]
    pub home: Option<PathBuf>,
    pub include_paths: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalyzerOverlay {
    pub enabled: Option<bool>,
    pub mode: Option<AnalyzerMode>,
    pub path: Option<String>,
    pub args: Option<Vec<String>>,
    pub compile_commands_dir: Option<PathBuf>,
    pub fallback_flags: Option<Vec<String>>,
    pub diagnostics_mode: Option<DiagnosticsMode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TriggerOverlay {
    pub on_save: Option<bool>,
    pub on_type: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let s = Settings::default();
        assert!(s.compiler.enabled);
        assert_eq!(s.compiler.path, "cragc");
        assert!(!s.analyzer.enabled);
        assert_eq!(s.analyzer.mode, AnalyzerMode::Augment);
        assert_eq!(s.analyzer.diagnostics_mode, DiagnosticsMode::Filtered);
        assert!(s.triggers.on_save);
        assert!(!s.triggers.on_type);
        assert_eq!(s.max_problems.0, DEFAULT_MAX_PROBLEMS);
    }

    #[test]
    fn overlay_present_keys_override() {
        let overlay: SettingsOverlay = serde_json::from_value(serde_json::json!({
            "compiler": { "path": "/opt/crag/bin/cragc", "enable": false },
            "maxNumberOfProblems": 10
        }))
        .unwrap();

        let merged = Settings::default().merged(&overlay);
        assert_eq!(merged.compiler.path, "/opt/crag/bin/cragc");
        assert!(!merged.compiler.enabled);
        assert_eq!(merged.max_problems.0, 10);
        // Untouched groups keep defaults
        assert_eq!(merged.analyzer.path, "clangd");
    }

    #[test]
    fn overlay_absent_keys_fall_through() {
        let base = Settings::default().merged(
            &serde_json::from_value(serde_json::json!({
                "compiler": { "includePaths": ["/a", "/b"] }
            }))
            .unwrap(),
        );

        let second: SettingsOverlay = serde_json::from_value(serde_json::json!({
            "compiler": { "path": "other" }
        }))
        .unwrap();

        let merged = base.merged(&second);
        assert_eq!(merged.compiler.path, "other");
        assert_eq!(
            merged.compiler.include_paths,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }

    #[test]
    fn merge_is_left_biased_across_layers() {
        let project: SettingsOverlay = serde_json::from_value(serde_json::json!({
            "analyzer": { "enabled": true, "path": "clangd-18" }
        }))
        .unwrap();
        let client: SettingsOverlay = serde_json::from_value(serde_json::json!({
            "analyzer": { "path": "clangd-19" }
        }))
        .unwrap();

        let merged = Settings::default().merged(&project).merged(&client);
        assert!(merged.analyzer.enabled);
        assert_eq!(merged.analyzer.path, "clangd-19");
    }

    #[test]
    fn analyzer_mode_parse() {
        assert_eq!("proxy".parse::<AnalyzerMode>(), Ok(AnalyzerMode::Proxy));
        assert_eq!("augment".parse::<AnalyzerMode>(), Ok(AnalyzerMode::Augment));
        assert_eq!(
            "disabled".parse::<AnalyzerMode>(),
            Ok(AnalyzerMode::Disabled)
        );
        assert!("Proxy".parse::<AnalyzerMode>().is_err());
    }

    #[test]
    fn diagnostics_mode_parse() {
        assert_eq!("all".parse::<DiagnosticsMode>(), Ok(DiagnosticsMode::All));
        assert_eq!(
            "filtered".parse::<DiagnosticsMode>(),
            Ok(DiagnosticsMode::Filtered)
        );
        assert_eq!("none".parse::<DiagnosticsMode>(), Ok(DiagnosticsMode::None));
        assert!("off".parse::<DiagnosticsMode>().is_err());
    }

    #[test]
    fn fingerprint_ignores_non_analyzer_fields() {
        let a = Settings::default();
        let mut b = Settings::default();
        b.max_problems = MaxProblems(5);
        b.compiler.path = "elsewhere".to_string();
        assert_eq!(a.analyzer_fingerprint(), b.analyzer_fingerprint());
    }

    #[test]
    fn fingerprint_tracks_analyzer_fields() {
        let a = Settings::default();
        let mut b = Settings::default();
        b.analyzer.args = vec!["--log=verbose".to_string()];
        assert_ne!(a.analyzer_fingerprint(), b.analyzer_fingerprint());
    }

    #[test]
    fn overlay_rejects_unknown_fields() {
        let result: Result<SettingsOverlay, _> = serde_json::from_value(serde_json::json!({
            "compilerr": { "path": "x" }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn diagnostics_mode_deserializes_lowercase() {
        let overlay: SettingsOverlay = serde_json::from_value(serde_json::json!({
            "analyzer": { "diagnosticsMode": "none", "mode": "proxy" }
        }))
        .unwrap();
        let merged = Settings::default().merged(&overlay);
        assert_eq!(merged.analyzer.diagnostics_mode, DiagnosticsMode::None);
        assert_eq!(merged.analyzer.mode, AnalyzerMode::Proxy);
    }
}
