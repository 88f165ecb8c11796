//! Single shared analyzer session, keyed by configuration fingerprint.
//!
//! At most one session exists process-wide. Reconfiguration stops the old
//! session before starting the new one; a reconfiguration with an
//! identical fingerprint and a live session is a no-op. The analyzer runs
//! only while it is needed: enabled in settings and the compiler
//! unavailable (the compiler is the primary diagnostics source).

use std::path::Path;

use tokio::sync::mpsc;

use crag_types::{AnalyzerMode, Settings};

use crate::session::{AnalyzerSession, SessionPhase};
use crate::types::AnalyzerEvent;

struct ActiveSession {
    fingerprint: String,
    session: AnalyzerSession,
}

pub struct AnalyzerManager {
    event_tx: mpsc::Sender<AnalyzerEvent>,
    active: Option<ActiveSession>,
}

impl AnalyzerManager {
    #[must_use]
    pub fn new(event_tx: mpsc::Sender<AnalyzerEvent>) -> Self {
        Self {
            event_tx,
            active: None,
        }
    }

    /// Whether the current settings call for a running session.
    #[must_use]
    pub fn should_run(settings: &Settings, compiler_available: bool) -> bool {
        settings.analyzer.enabled
            && settings.analyzer.mode != AnalyzerMode::Disabled
            && !compiler_available
    }

    /// Bring the session in line with the settings snapshot: start, stop,
    /// or restart as the fingerprint dictates. Start failures degrade to a
    /// log line; the server keeps running on its other sources.
    pub async fn reconfigure(
        &mut self,
        settings: &Settings,
        workspace_root: &Path,
        compiler_available: bool,
    ) {
        if !Self::should_run(settings, compiler_available) {
            if let Some(active) = self.active.take() {
                tracing::info!("stopping analyzer session (no longer needed)");
                active.session.stop().await;
            }
            return;
        }

        let fingerprint = settings.analyzer_fingerprint();
        if let Some(active) = &self.active
            && active.fingerprint == fingerprint
            && active.session.phase() != SessionPhase::Stopped
        {
            return;
        }
        // Stop before start: never two sessions at once.
        if let Some(old) = self.active.take() {
            old.session.stop().await;
        }

        match AnalyzerSession::start(&settings.analyzer, workspace_root, self.event_tx.clone()) {
            Ok(session) => {
                tracing::info!(path = %settings.analyzer.path, "analyzer session starting");
                self.active = Some(ActiveSession {
                    fingerprint,
                    session,
                });
            }
            Err(e) => {
                tracing::warn!("analyzer unavailable: {e}");
            }
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&AnalyzerSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    /// Session exists and completed its handshake.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.session().is_some_and(AnalyzerSession::is_ready)
    }

    pub async fn shutdown(&mut self) {
        if let Some(active) = self.active.take() {
            active.session.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer_settings(args: &[&str]) -> Settings {
        let mut settings = Settings::default();
        settings.analyzer.enabled = true;
        settings.analyzer.path = "sleep".to_string();
        settings.analyzer.args = std::iter::once("30")
            .chain(args.iter().copied())
            .map(String::from)
            .collect();
        settings
    }

    #[test]
    fn should_run_requires_enabled_and_no_compiler() {
        let mut settings = Settings::default();
        assert!(!AnalyzerManager::should_run(&settings, false));

        settings.analyzer.enabled = true;
        assert!(AnalyzerManager::should_run(&settings, false));
        assert!(!AnalyzerManager::should_run(&settings, true));

        settings.analyzer.mode = AnalyzerMode::Disabled;
        assert!(!AnalyzerManager::should_run(&settings, false));
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        #[tokio::test]
        async fn disabled_analyzer_never_starts() {
            let (event_tx, _event_rx) = mpsc::channel(8);
            let mut manager = AnalyzerManager::new(event_tx);
            manager
                .reconfigure(&Settings::default(), Path::new("/tmp"), false)
                .await;
            assert!(manager.session().is_none());
        }

        #[tokio::test]
        async fn identical_fingerprint_is_a_no_op() {
            let (event_tx, _event_rx) = mpsc::channel(8);
            let mut manager = AnalyzerManager::new(event_tx);
            let settings = analyzer_settings(&[]);

            manager.reconfigure(&settings, Path::new("/tmp"), false).await;
            let first = manager.session().unwrap() as *const AnalyzerSession;

            manager.reconfigure(&settings, Path::new("/tmp"), false).await;
            let second = manager.session().unwrap() as *const AnalyzerSession;
            assert_eq!(first, second, "same fingerprint must keep the session");

            manager.shutdown().await;
        }

        #[tokio::test]
        async fn changed_fingerprint_restarts() {
            let (event_tx, _event_rx) = mpsc::channel(8);
            let mut manager = AnalyzerManager::new(event_tx);

            manager
                .reconfigure(&analyzer_settings(&[]), Path::new("/tmp"), false)
                .await;
            assert!(manager.session().is_some());

            manager
                .reconfigure(&analyzer_settings(&["--extra"]), Path::new("/tmp"), false)
                .await;
            // Still exactly one session, now under the new fingerprint.
            assert!(manager.session().is_some());
            assert_eq!(
                manager.active.as_ref().unwrap().fingerprint,
                analyzer_settings(&["--extra"]).analyzer_fingerprint()
            );

            manager.shutdown().await;
        }

        #[tokio::test]
        async fn compiler_becoming_available_stops_session() {
            let (event_tx, _event_rx) = mpsc::channel(8);
            let mut manager = AnalyzerManager::new(event_tx);
            let settings = analyzer_settings(&[]);

            manager.reconfigure(&settings, Path::new("/tmp"), false).await;
            assert!(manager.session().is_some());

            manager.reconfigure(&settings, Path::new("/tmp"), true).await;
            assert!(manager.session().is_none());
        }
    }
}
