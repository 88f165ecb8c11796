//! Per-document diagnostic reconciliation.
//!
//! Each open document carries two independently-updated caches — local
//! (lint + compiler) and analyzer — plus the stamps that keep them
//! honest: local results are keyed by the document version validation
//! started at, analyzer results by a monotonic generation counter. A
//! result that lost its race is dropped, never published. The published
//! set is always the deduplicated union of the current caches, truncated
//! to the configured cap.

use std::collections::HashSet;

use dashmap::DashMap;

use crag_types::{Diagnostic, DiagnosticsMode};

use crate::lint;

/// Message fragments the analyzer produces when it trips over Crag
/// dialect syntax; `filtered` mode drops these on dialect lines.
const NOISE_PATTERNS: &[&str] = &[
    "unknown type name",
    "use of undeclared identifier",
    "expected expression",
    "expected ';'",
    "implicit declaration of function",
];

#[derive(Debug, Default)]
struct DocState {
    /// Latest document version the editor has shown us.
    version: i32,
    local: Vec<Diagnostic>,
    /// Version stamp of the cached local diagnostics.
    local_version: Option<i32>,
    analyzer: Vec<Diagnostic>,
    /// Monotonic stamp for analyzer arrivals.
    generation: u64,
}

/// Tracks every open document's diagnostic state, keyed by URI.
#[derive(Debug, Default)]
pub struct DocumentTracker {
    docs: DashMap<String, DocState>,
}

impl DocumentTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document (open) or record a newer version (change).
    /// Bumping the version is the write barrier: any in-flight validation
    /// stamped with an older version will be refused at store time.
    pub fn track(&self, uri: &str, version: i32) {
        let mut state = self.docs.entry(uri.to_string()).or_default();
        state.version = version;
    }

    /// Forget a document and return an empty set to publish, so the
    /// editor drops its stale diagnostics too.
    pub fn close(&self, uri: &str) -> Vec<Diagnostic> {
        self.docs.remove(uri);
        Vec::new()
    }

    #[must_use]
    pub fn is_tracked(&self, uri: &str) -> bool {
        self.docs.contains_key(uri)
    }

    /// Store local (lint + compiler) results stamped with the version the
    /// validation started at. Returns the merged set to publish, or
    /// `None` when the result is stale — a newer version superseded the
    /// document while this validation ran.
    #[must_use]
    pub fn store_local(
        &self,
        uri: &str,
        validated_version: i32,
        diagnostics: Vec<Diagnostic>,
        max_problems: usize,
    ) -> Option<Vec<Diagnostic>> {
        let mut state = self.docs.get_mut(uri)?;
        if validated_version < state.version
            || state
                .local_version
                .is_some_and(|stored| validated_version < stored)
        {
            tracing::debug!(
                uri,
                validated_version,
                current = state.version,
                "dropping stale validation result"
            );
            return None;
        }
        state.local = diagnostics;
        state.local_version = Some(validated_version);
        Some(merge(&state.analyzer, &state.local, max_problems))
    }

    /// Stamp an analyzer arrival. The returned generation token must be
    /// presented back to [`store_analyzer`](Self::store_analyzer); by
    /// then a newer arrival may have superseded it.
    #[must_use]
    pub fn begin_analyzer_update(&self, uri: &str) -> Option<u64> {
        let mut state = self.docs.get_mut(uri)?;
        state.generation += 1;
        Some(state.generation)
    }

    /// Store analyzer results if `generation` is still the latest.
    /// Returns the merged set to publish, or `None` when superseded.
    #[must_use]
    pub fn store_analyzer(
        &self,
        uri: &str,
        generation: u64,
        diagnostics: Vec<Diagnostic>,
        max_problems: usize,
    ) -> Option<Vec<Diagnostic>> {
        let mut state = self.docs.get_mut(uri)?;
        if generation != state.generation {
            tracing::debug!(uri, generation, current = state.generation, "dropping superseded analyzer diagnostics");
            return None;
        }
        state.analyzer = diagnostics;
        Some(merge(&state.analyzer, &state.local, max_problems))
    }
}

/// Publish set: analyzer cache then local cache, deduplicated by
/// (position, severity, message, origin), truncated to the cap.
#[must_use]
pub fn merge(analyzer: &[Diagnostic], local: &[Diagnostic], max_problems: usize) -> Vec<Diagnostic> {
    let mut seen = HashSet::new();
    analyzer
        .iter()
        .chain(local.iter())
        .filter(|d| {
            let (line, col, severity, message, origin) = d.dedup_key();
            seen.insert((line, col, severity, message.to_string(), origin))
        })
        .take(max_problems)
        .cloned()
        .collect()
}

/// Apply the diagnostics-mode policy to analyzer-sourced diagnostics.
/// `filtered` drops known-noise messages on lines that use dialect
/// syntax; the document text provides the line contents.
#[must_use]
pub fn apply_diagnostics_mode(
    mode: DiagnosticsMode,
    diagnostics: Vec<Diagnostic>,
    text: &str,
) -> Vec<Diagnostic> {
    match mode {
        DiagnosticsMode::None => Vec::new(),
        DiagnosticsMode::All => diagnostics,
        DiagnosticsMode::Filtered => {
            let lines: Vec<&str> = text.lines().collect();
            diagnostics
                .into_iter()
                .filter(|d| {
                    let on_dialect_line = lines
                        .get(d.line() as usize)
                        .is_some_and(|line| lint::is_dialect_line(line));
                    let noisy = NOISE_PATTERNS
                        .iter()
                        .any(|pattern| d.message().contains(pattern));
                    !(on_dialect_line && noisy)
                })
                .collect()
        }
    }
}
