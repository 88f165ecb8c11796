//! One-shot `cragc` subprocess runner.
//!
//! The document text is materialized into a scratch directory and compiled
//! with syntax-only flags; combined stdout/stderr is parsed back into
//! [`Diagnostic`]s. The scratch directory is removed on every exit path
//! (RAII), taking compiler-generated intermediates with it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::process::Command;

use crag_types::{CompilerSettings, Diagnostic, DiagnosticOrigin, Settings, Severity};

use crate::include::collect_include_dirs;
use crate::resolve::resolve_executable;

/// Wall-clock limit for a single compiler run.
pub const COMPILE_TIMEOUT: Duration = Duration::from_secs(30);

/// Substrings that let a bare `file:line: message` line count as an error.
const ERROR_HINTS: &[&str] = &["error", "expected", "unknown", "not defined", "syntax"];

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("compiler not found (configured path: {command})")]
    NotFound { command: String },
    #[error("compiler timed out after {}s", timeout.as_secs())]
    Timeout { timeout: Duration },
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("compiler i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Installation root: explicit setting first, `CRAG_HOME` second.
fn crag_home(settings: &CompilerSettings) -> Option<PathBuf> {
    settings
        .home
        .clone()
        .or_else(|| std::env::var_os("CRAG_HOME").map(PathBuf::from))
}

fn compiler_exe_name() -> String {
    format!("cragc{}", std::env::consts::EXE_SUFFIX)
}

/// Resolve the compiler through the candidate chain: the configured path,
/// conventional locations under the installation root, then fixed
/// fallback install locations. First resolvable candidate wins.
#[must_use]
pub fn resolve_compiler(settings: &CompilerSettings) -> Option<PathBuf> {
    let mut candidates = vec![settings.path.clone()];

    if let Some(home) = crag_home(settings) {
        candidates.push(home.join("bin").join(compiler_exe_name()).display().to_string());
        candidates.push(home.join(compiler_exe_name()).display().to_string());
    }

    #[cfg(windows)]
    candidates.push(r"C:\Program Files\Crag\bin\cragc.exe".to_string());
    #[cfg(not(windows))]
    {
        candidates.push("/usr/local/crag/bin/cragc".to_string());
        candidates.push("/opt/crag/bin/cragc".to_string());
    }

    candidates
        .iter()
        .find_map(|candidate| resolve_executable(candidate))
}

/// `-I<dir>` flags, one single token per directory.
fn include_flags(dirs: &[PathBuf]) -> Vec<String> {
    dirs.iter().map(|d| format!("-I{}", d.display())).collect()
}

/// Runs `cragc` against document snapshots.
#[derive(Debug, Clone)]
pub struct CompilerRunner {
    timeout: Duration,
}

impl Default for CompilerRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerRunner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: COMPILE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run the compiler and absorb failures per the degradation policy:
    /// an unresolvable/unspawnable compiler becomes a single advisory
    /// warning at the top of the document; anything else is logged and
    /// yields an empty list. Never panics, never propagates.
    pub async fn run(&self, document: &Path, text: &str, settings: &Settings) -> Vec<Diagnostic> {
        if !settings.compiler.enabled {
            return Vec::new();
        }
        match self.run_checked(document, text, settings).await {
            Ok(diags) => diags,
            Err(e @ (ToolError::NotFound { .. } | ToolError::Spawn { .. })) => {
                tracing::warn!(document = %document.display(), "{e}");
                vec![Diagnostic::new(
                    Severity::Warning,
                    format!(
                        "cragc not found (configured path: {}); install Crag or set compiler.path",
                        settings.compiler.path
                    ),
                    0,
                    0,
                    DiagnosticOrigin::Compiler,
                )]
            }
            Err(e) => {
                tracing::warn!(document = %document.display(), "compiler run failed: {e}");
                Vec::new()
            }
        }
    }

    /// Run the compiler, surfacing failures to the caller (the CLI uses
    /// this to distinguish operational failure from a clean empty result).
    pub async fn run_checked(
        &self,
        document: &Path,
        text: &str,
        settings: &Settings,
    ) -> Result<Vec<Diagnostic>, ToolError> {
        let command = resolve_compiler(&settings.compiler)
            .unwrap_or_else(|| PathBuf::from(&settings.compiler.path));

        let scratch = tempfile::TempDir::new()?;
        let stem = document
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled");
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        let scratch_name = format!("{stem}-{millis}.crag");
        let scratch_path = scratch.path().join(&scratch_name);
        std::fs::write(&scratch_path, text)?;

        let include_dirs = collect_include_dirs(document, &settings.compiler.include_paths);

        let mut cmd = Command::new(&command);
        cmd.arg("-Wall")
            .arg("-fsyntax-only")
            .args(include_flags(&include_dirs))
            .arg(&scratch_path)
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(home) = crag_home(&settings.compiler) {
            cmd.env("CRAG_HOME", home);
        }

        let child = cmd.spawn().map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ToolError::NotFound {
                    command: settings.compiler.path.clone(),
                }
            } else {
                ToolError::Spawn {
                    command: command.display().to_string(),
                    source,
                }
            }
        })?;

        // kill_on_drop: when the timeout drops the wait future, the child
        // goes with it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ToolError::Timeout {
                timeout: self.timeout,
            })??;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push('\n');
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        let original_name = document.file_name().and_then(|n| n.to_str()).unwrap_or("");
        Ok(parse_output(
            &combined,
            &scratch_name,
            original_name,
            settings.max_problems.0,
        ))
    }
}

/// Parse combined compiler output. Three patterns are tried per line, most
/// specific first; diagnostics for files other than the compiled one are
/// dropped; parsing stops once `max` diagnostics are collected.
fn parse_output(output: &str, scratch_name: &str, original_name: &str, max: usize) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for line in output.lines() {
        if diags.len() >= max {
            break;
        }
        let Some((file, diag)) = parse_line(line) else {
            continue;
        };
        let basename = Path::new(&file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&file)
            .to_string();
        if basename == scratch_name || basename == original_name {
            diags.push(diag);
        }
    }
    diags
}

fn patterns() -> &'static [regex::Regex; 3] {
    static PATTERNS: OnceLock<[regex::Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            regex::Regex::new(r"^(.+?):(\d+):(\d+):\s*([A-Za-z ]+):\s*(.+)$").expect("valid regex"),
            regex::Regex::new(r"^(.+?):(\d+):\s*([A-Za-z ]+):\s*(.+)$").expect("valid regex"),
            regex::Regex::new(r"^(.+?):(\d+):\s*(.+)$").expect("valid regex"),
        ]
    })
}

/// Producers report 1-based positions; convert to the internal 0-based
/// coordinates here.
fn parse_line(line: &str) -> Option<(String, Diagnostic)> {
    let [full, no_col, bare] = patterns();

    if let Some(caps) = full.captures(line)
        && let Some(severity) = Severity::from_label(&caps[4])
    {
        let row: u32 = caps[2].parse().ok()?;
        let col: u32 = caps[3].parse().ok()?;
        return Some((
            caps[1].to_string(),
            Diagnostic::new(
                severity,
                caps[5].trim().to_string(),
                row.saturating_sub(1),
                col.saturating_sub(1),
                DiagnosticOrigin::Compiler,
            ),
        ));
    }

    if let Some(caps) = no_col.captures(line)
        && let Some(severity) = Severity::from_label(&caps[3])
    {
        let row: u32 = caps[2].parse().ok()?;
        return Some((
            caps[1].to_string(),
            Diagnostic::new(
                severity,
                caps[4].trim().to_string(),
                row.saturating_sub(1),
                0,
                DiagnosticOrigin::Compiler,
            ),
        ));
    }

    if let Some(caps) = bare.captures(line) {
        let message = caps[3].trim().to_string();
        let lowered = message.to_lowercase();
        if ERROR_HINTS.iter().any(|hint| lowered.contains(hint)) {
            let row: u32 = caps[2].parse().ok()?;
            return Some((
                caps[1].to_string(),
                Diagnostic::new(
                    Severity::Error,
                    message,
                    row.saturating_sub(1),
                    0,
                    DiagnosticOrigin::Compiler,
                ),
            ));
        }
    }

    None
}
