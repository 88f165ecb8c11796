//! Diagnostic types exchanged between the diagnostic producers and the
//! reconciler.
//!
//! Producers report 1-based lines; everything internal is 0-based. The
//! boundary code that parses producer output does the conversion, so a
//! constructed [`Diagnostic`] is always 0-based.

use serde::Serialize;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl Severity {
    /// Convert from LSP numeric severity (1=Error, 2=Warning, 3=Info, 4=Hint).
    ///
    /// Returns `None` for values outside the LSP-defined range.
    /// Callers (boundary code) decide the fallback policy.
    #[must_use]
    pub fn from_lsp(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Information),
            4 => Some(Self::Hint),
            _ => None,
        }
    }

    /// Parse a severity word from compiler output (`error`, `warning`, ...).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "error" | "fatal error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "note" | "info" => Some(Self::Information),
            "hint" | "remark" => Some(Self::Hint),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

/// Which producer emitted a diagnostic.
///
/// The reconciler treats the origin as part of a diagnostic's identity:
/// two otherwise-identical diagnostics from different producers are kept
/// as two entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticOrigin {
    /// The in-process heuristic lint pass.
    Lint,
    /// The `cragc` batch compiler.
    Compiler,
    /// The external language-server analyzer.
    Analyzer,
}

impl DiagnosticOrigin {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Lint => "crag-lint",
            Self::Compiler => "cragc",
            Self::Analyzer => "analyzer",
        }
    }
}

/// A single diagnostic, immutable once constructed.
///
/// Fields are private; external consumers read via accessors. Line and
/// column are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    severity: Severity,
    message: String,
    /// 0-indexed line number.
    line: u32,
    /// 0-indexed column.
    col: u32,
    origin: DiagnosticOrigin,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        severity: Severity,
        message: String,
        line: u32,
        col: u32,
        origin: DiagnosticOrigin,
    ) -> Self {
        Self {
            severity,
            message,
            line,
            col,
            origin,
        }
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 0-indexed line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 0-indexed column.
    #[must_use]
    pub fn col(&self) -> u32 {
        self.col
    }

    #[must_use]
    pub fn origin(&self) -> DiagnosticOrigin {
        self.origin
    }

    /// Identity tuple used for deduplication: position, severity, message,
    /// and origin. Diagnostics differing only in origin are distinct.
    #[must_use]
    pub fn dedup_key(&self) -> (u32, u32, Severity, &str, DiagnosticOrigin) {
        (
            self.line,
            self.col,
            self.severity,
            self.message.as_str(),
            self.origin,
        )
    }

    /// Format as `path:line:col: severity: message` (1-indexed for display).
    #[must_use]
    pub fn display_with_path(&self, path: &std::path::Path) -> String {
        format!(
            "{}:{}:{}: {}: [{}] {}",
            path.display(),
            self.line + 1,
            self.col + 1,
            self.severity.label(),
            self.origin.label(),
            self.message,
        )
    }
}
