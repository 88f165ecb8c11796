//! `crag-check` — one-shot diagnostics for Crag sources.
//!
//! A thin restatement of the server's pipeline for scripted use: lint,
//! compile, or fall back to a single analyzer query, then print the
//! merged diagnostics as text or JSON.
//!
//! Exit codes: 0 = clean, 1 = error-severity diagnostics or invalid
//! usage, 2 = operational failure (analyzer crash, unreadable
//! explicitly-requested project config, neither source available).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crag_analyzer::{AnalyzerError, AnalyzerEvent, AnalyzerSession, protocol};
use crag_config::SettingsResolver;
use crag_server::{lint, reconcile};
use crag_toolchain::{CompilerRunner, collect_include_dirs, resolve_compiler, resolve_executable};
use crag_types::{
    AnalyzerMode, AnalyzerOverlay, CompilerOverlay, Diagnostic, DiagnosticOrigin, DiagnosticsMode,
    Settings, SettingsOverlay, Severity,
};

/// How long the one-shot query waits for the analyzer's diagnostics
/// notification before accepting an empty result.
const ANALYZER_WAIT: Duration = Duration::from_secs(4);

#[derive(Debug, Parser)]
#[command(name = "crag-check", version, about = "One-shot diagnostics for Crag sources")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a source file and print its diagnostics
    Check {
        /// The Crag source file
        file: PathBuf,

        #[command(flatten)]
        overrides: SettingsArgs,

        /// Output format
        #[arg(long, value_name = "FORMAT", default_value = "text", value_parser = OutputFormat::from_str)]
        format: OutputFormat,

        /// Wrap the source in the extra includes before checking
        #[arg(long)]
        wrap_header: bool,

        /// Header to prepend in wrap-header mode (repeatable)
        #[arg(long = "wrap-include", value_name = "HEADER", requires = "wrap_header")]
        wrap_includes: Vec<String>,

        /// Use this project config instead of discovering one
        #[arg(long, value_name = "FILE")]
        project_config: Option<PathBuf>,
    },
    /// Report tool resolution and the effective configuration
    Doctor {
        /// Probe file for discovery and the include chain (defaults to
        /// the working directory)
        file: Option<PathBuf>,

        #[command(flatten)]
        overrides: SettingsArgs,

        /// Output format
        #[arg(long, value_name = "FORMAT", default_value = "text", value_parser = OutputFormat::from_str)]
        format: OutputFormat,
    },
}

/// Flags mirroring every settings field; folded in as the most specific
/// configuration layer.
#[derive(Debug, Args)]
struct SettingsArgs {
    /// Compiler executable
    #[arg(long, value_name = "PATH")]
    compiler_path: Option<String>,

    /// Skip the compiler entirely
    #[arg(long)]
    no_compiler: bool,

    /// Extra include directory (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Crag installation root (overrides CRAG_HOME)
    #[arg(long, value_name = "DIR")]
    crag_home: Option<PathBuf>,

    /// Enable the analyzer fallback
    #[arg(long)]
    analyzer: bool,

    /// Analyzer executable
    #[arg(long, value_name = "PATH")]
    analyzer_path: Option<String>,

    /// Extra analyzer argument (repeatable)
    #[arg(long = "analyzer-arg", value_name = "ARG", allow_hyphen_values = true)]
    analyzer_args: Vec<String>,

    /// Directory holding compile_commands.json
    #[arg(long, value_name = "DIR")]
    compile_commands_dir: Option<PathBuf>,

    /// Compiler-style flag for the analyzer's fallback command line
    /// (repeatable)
    #[arg(long = "fallback-flag", value_name = "FLAG", allow_hyphen_values = true)]
    fallback_flags: Vec<String>,

    /// Analyzer diagnostics policy: all, filtered, or none
    #[arg(long, value_name = "MODE", value_parser = DiagnosticsMode::from_str)]
    diagnostics_mode: Option<DiagnosticsMode>,

    /// Cap on reported diagnostics
    #[arg(long, value_name = "N")]
    max_problems: Option<usize>,
}

impl SettingsArgs {
    fn to_overlay(&self) -> SettingsOverlay {
        let compiler = CompilerOverlay {
            path: self.compiler_path.clone(),
            enabled: self.no_compiler.then_some(false),
            home: self.crag_home.clone(),
            include_paths: (!self.include.is_empty()).then(|| self.include.clone()),
        };
        let analyzer = AnalyzerOverlay {
            enabled: self.analyzer.then_some(true),
            mode: None,
            path: self.analyzer_path.clone(),
            args: (!self.analyzer_args.is_empty()).then(|| self.analyzer_args.clone()),
            compile_commands_dir: self.compile_commands_dir.clone(),
            fallback_flags: (!self.fallback_flags.is_empty()).then(|| self.fallback_flags.clone()),
            diagnostics_mode: self.diagnostics_mode,
        };
        SettingsOverlay {
            compiler: Some(compiler),
            analyzer: Some(analyzer),
            triggers: None,
            max_problems: self.max_problems,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("invalid format '{other}' (expected text or json)")),
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version print cleanly and exit 0; real usage
            // errors are exit 1 per the documented taxonomy.
            let is_usage_error = e.use_stderr();
            let _ = e.print();
            return if is_usage_error {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_tracing(cli.verbose, cli.quiet);

    let outcome = match cli.command {
        Command::Check {
            file,
            overrides,
            format,
            wrap_header,
            wrap_includes,
            project_config,
        } => {
            run_check(
                &file,
                &overrides,
                format,
                wrap_header,
                &wrap_includes,
                project_config.as_deref(),
            )
            .await
        }
        Command::Doctor {
            file,
            overrides,
            format,
        } => run_doctor(file.as_deref(), &overrides, format),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("crag-check: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn resolve_settings(
    file: &Path,
    overrides: &SettingsArgs,
    project_config: Option<&Path>,
) -> anyhow::Result<Settings> {
    let mut resolver = SettingsResolver::new();
    if let Some(config_path) = project_config {
        // Explicitly requested: unreadable is an operational failure.
        let overlay = crag_config::load_project_file(config_path)
            .with_context(|| format!("project config {}", config_path.display()))?;
        resolver.set_client_overlay(Some(overlay));
    }
    resolver.set_cli_overlay(overrides.to_overlay());
    Ok(resolver.settings_for(file))
}

fn wrap_source(text: &str, includes: &[String]) -> (String, u32) {
    let mut wrapped = String::new();
    for header in includes {
        wrapped.push_str(&format!("#include \"{header}\"\n"));
    }
    wrapped.push_str(text);
    (wrapped, includes.len() as u32)
}

/// Shift diagnostics back to the user's coordinates after wrap-header
/// mode; anything inside the synthetic prelude is dropped.
fn unshift_diagnostics(diagnostics: Vec<Diagnostic>, offset: u32) -> Vec<Diagnostic> {
    if offset == 0 {
        return diagnostics;
    }
    diagnostics
        .into_iter()
        .filter(|d| d.line() >= offset)
        .map(|d| {
            Diagnostic::new(
                d.severity(),
                d.message().to_string(),
                d.line() - offset,
                d.col(),
                d.origin(),
            )
        })
        .collect()
}

async fn run_check(
    file: &Path,
    overrides: &SettingsArgs,
    format: OutputFormat,
    wrap_header: bool,
    wrap_includes: &[String],
    project_config: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let settings = resolve_settings(file, overrides, project_config)?;

    let Ok(text) = std::fs::read_to_string(file) else {
        eprintln!("crag-check: cannot read {}", file.display());
        return Ok(ExitCode::from(1));
    };

    let compiler_available =
        settings.compiler.enabled && resolve_compiler(&settings.compiler).is_some();
    let analyzer_eligible =
        settings.analyzer.enabled && settings.analyzer.mode != AnalyzerMode::Disabled;

    if !compiler_available && !analyzer_eligible {
        anyhow::bail!(
            "no diagnostic source available: compiler '{}' not found and the analyzer is disabled \
             (try --compiler-path or --analyzer)",
            settings.compiler.path
        );
    }

    let (checked_text, line_offset) = if wrap_header {
        wrap_source(&text, wrap_includes)
    } else {
        (text, 0)
    };

    let mut local = unshift_diagnostics(lint::check(&checked_text), line_offset);

    if compiler_available {
        let runner = CompilerRunner::new();
        match runner.run_checked(file, &checked_text, &settings).await {
            Ok(diags) => local.extend(unshift_diagnostics(diags, line_offset)),
            Err(e) => tracing::warn!("compiler run failed: {e}"),
        }
    }

    let analyzer = if !compiler_available && analyzer_eligible {
        let raw = analyzer_query(file, &checked_text, &settings, ANALYZER_WAIT).await?;
        let filtered =
            reconcile::apply_diagnostics_mode(settings.analyzer.diagnostics_mode, raw, &checked_text);
        unshift_diagnostics(filtered, line_offset)
    } else {
        Vec::new()
    };

    let merged = reconcile::merge(&analyzer, &local, settings.max_problems.0);
    print_diagnostics(file, &merged, format);

    let has_errors = merged.iter().any(|d| d.severity().is_error());
    Ok(if has_errors {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

/// One-shot analyzer query: open the document, then race the diagnostics
/// notification against the fixed wait. Timeout means an empty result,
/// never a hang; a session death means operational failure.
async fn analyzer_query(
    file: &Path,
    text: &str,
    settings: &Settings,
    wait: Duration,
) -> anyhow::Result<Vec<Diagnostic>> {
    let root = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let session = match AnalyzerSession::start(&settings.analyzer, &root, event_tx) {
        Ok(session) => session,
        Err(AnalyzerError::NotFound { command }) => {
            anyhow::bail!("analyzer '{command}' not found and no compiler available");
        }
        Err(e) => return Err(e).context("starting analyzer"),
    };

    let uri = protocol::path_to_file_uri(file)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("file://{}", file.display()));
    session
        .notify(
            "textDocument/didOpen",
            protocol::did_open_params(&uri, 1, text),
        )
        .await
        .context("sending didOpen")?;

    let waited = tokio::time::timeout(wait, async {
        while let Some(event) = event_rx.recv().await {
            match event {
                AnalyzerEvent::Diagnostics {
                    uri: event_uri,
                    diagnostics,
                } if event_uri == uri => return Ok(diagnostics),
                AnalyzerEvent::Stopped { reason } => {
                    anyhow::bail!("analyzer stopped before answering: {reason:?}");
                }
                _ => {}
            }
        }
        anyhow::bail!("analyzer event channel closed");
    })
    .await;

    session.stop().await;

    match waited {
        Ok(result) => result,
        // No diagnostics inside the window: accept the empty answer.
        Err(_) => Ok(Vec::new()),
    }
}

fn print_diagnostics(file: &Path, diagnostics: &[Diagnostic], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            for diag in diagnostics {
                println!("{}", diag.display_with_path(file));
            }
            let errors = count(diagnostics, Severity::Error);
            let warnings = count(diagnostics, Severity::Warning);
            eprintln!("{errors} error(s), {warnings} warning(s)");
        }
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "file": file.display().to_string(),
                "diagnostics": diagnostics,
                "counts": {
                    "error": count(diagnostics, Severity::Error),
                    "warning": count(diagnostics, Severity::Warning),
                    "info": count(diagnostics, Severity::Information),
                    "hint": count(diagnostics, Severity::Hint),
                },
                "byOrigin": {
                    "lint": count_origin(diagnostics, DiagnosticOrigin::Lint),
                    "compiler": count_origin(diagnostics, DiagnosticOrigin::Compiler),
                    "analyzer": count_origin(diagnostics, DiagnosticOrigin::Analyzer),
                },
            });
            println!("{payload:#}");
        }
    }
}

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity() == severity)
        .count()
}

fn count_origin(diagnostics: &[Diagnostic], origin: DiagnosticOrigin) -> usize {
    diagnostics.iter().filter(|d| d.origin() == origin).count()
}

fn run_doctor(
    file: Option<&Path>,
    overrides: &SettingsArgs,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let probe = file
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let settings = resolve_settings(&probe, overrides, None)?;

    let compiler = resolve_compiler(&settings.compiler);
    let analyzer = resolve_executable(&settings.analyzer.path);
    let project = crag_config::discover_project_file(&probe);
    let crag_home = settings
        .compiler
        .home
        .clone()
        .or_else(|| std::env::var_os("CRAG_HOME").map(PathBuf::from));
    let includes = collect_include_dirs(&probe, &settings.compiler.include_paths);

    let compiler_available = settings.compiler.enabled && compiler.is_some();
    let analyzer_eligible = settings.analyzer.enabled
        && settings.analyzer.mode != AnalyzerMode::Disabled
        && analyzer.is_some();

    match format {
        OutputFormat::Text => {
            let shown = |p: &Option<PathBuf>| {
                p.as_ref()
                    .map_or_else(|| "not found".to_string(), |p| p.display().to_string())
            };
            println!("compiler:       {} -> {}", settings.compiler.path, shown(&compiler));
            println!("analyzer:       {} -> {}", settings.analyzer.path, shown(&analyzer));
            println!(
                "analyzer use:   enabled={} mode={:?} diagnostics={:?}",
                settings.analyzer.enabled, settings.analyzer.mode, settings.analyzer.diagnostics_mode
            );
            println!("CRAG_HOME:      {}", shown(&crag_home));
            println!("project config: {}", shown(&project));
            println!("include dirs:");
            for dir in &includes {
                println!("  -I{}", dir.display());
            }
            println!("max problems:   {}", settings.max_problems.0);
        }
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "compiler": { "configured": settings.compiler.path, "resolved": compiler,
                              "enabled": settings.compiler.enabled },
                "analyzer": { "configured": settings.analyzer.path, "resolved": analyzer,
                              "enabled": settings.analyzer.enabled },
                "cragHome": crag_home,
                "projectConfig": project,
                "includeDirs": includes,
                "maxProblems": settings.max_problems.0,
            });
            println!("{payload:#}");
        }
    }

    if !compiler_available && !analyzer_eligible {
        eprintln!("crag-check: no working diagnostic source");
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
