//! Core types shared across the Crag tooling crates.
//!
//! A [`Diagnostic`] is the unit of exchange between every stage of the
//! pipeline: the lint pass, the compiler runner, the analyzer client, and
//! the reconciler all produce or consume lists of them. [`Settings`] is the
//! immutable-per-use configuration snapshot threaded through the same
//! stages.

pub mod diagnostic;
pub mod settings;

pub use diagnostic::{Diagnostic, DiagnosticOrigin, Severity};
pub use settings::{
    AnalyzerMode, AnalyzerOverlay, AnalyzerSettings, CompilerOverlay, CompilerSettings,
    DiagnosticsMode, MaxProblems, Settings, SettingsOverlay, TriggerOverlay, TriggerSettings,
};
