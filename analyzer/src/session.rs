//! Analyzer session: one child process, one duplex JSON-RPC conversation.
//!
//! Lifecycle: `Starting` (handshake in flight) → `Ready` → `Stopped`.
//! The bootstrap `initialize` request bypasses the readiness gate — by
//! definition nothing is ready yet. Notifications sent while starting are
//! queued and flushed in FIFO order the moment the handshake completes,
//! so document events reach the analyzer in the exact order the editor
//! produced them. Once `Stopped`, no event fires again and every pending
//! request is rejected.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, oneshot, watch};

use crag_toolchain::resolve_executable;
use crag_types::AnalyzerSettings;

use crate::codec::{FrameReader, FrameWriter};
use crate::protocol::{self, Incoming};
use crate::types::{AnalyzerError, AnalyzerEvent, LogLevel, StopReason};

const INIT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
const WRITER_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
enum WriterCommand {
    Send(serde_json::Value),
    Shutdown,
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Starting,
    Ready,
    Stopped,
}

type PendingMap = HashMap<u64, oneshot::Sender<Result<serde_json::Value, AnalyzerError>>>;

/// State shared between the public handle and the I/O tasks. The one lock
/// covers both maps so the ready-flip and the queue flush are atomic with
/// respect to concurrent `notify` calls.
#[derive(Debug)]
struct Shared {
    pending: PendingMap,
    queued: VecDeque<serde_json::Value>,
}

#[derive(Debug)]
pub struct AnalyzerSession {
    child: Child,
    writer_tx: mpsc::Sender<WriterCommand>,
    next_id: Arc<AtomicU64>,
    shared: Arc<Mutex<Shared>>,
    phase_tx: Arc<watch::Sender<SessionPhase>>,
}

impl AnalyzerSession {
    /// Spawn the analyzer and begin the handshake in the background.
    /// The returned session is usable immediately: requests wait for
    /// readiness, notifications queue until the handshake completes.
    pub fn start(
        settings: &AnalyzerSettings,
        workspace_root: &Path,
        event_tx: mpsc::Sender<AnalyzerEvent>,
    ) -> Result<Self, AnalyzerError> {
        let command = resolve_executable(&settings.path).ok_or_else(|| AnalyzerError::NotFound {
            command: settings.path.clone(),
        })?;

        let mut args = settings.args.clone();
        if let Some(dir) = &settings.compile_commands_dir {
            args.push(format!("--compile-commands-dir={}", dir.display()));
        }

        let mut child = Command::new(&command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AnalyzerError::Spawn {
                command: settings.path.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(AnalyzerError::ChannelClosed)?;
        let stdout = child.stdout.take().ok_or(AnalyzerError::ChannelClosed)?;
        let stderr = child.stderr.take().ok_or(AnalyzerError::ChannelClosed)?;

        let shared = Arc::new(Mutex::new(Shared {
            pending: HashMap::new(),
            queued: VecDeque::new(),
        }));
        let (phase_tx, _) = watch::channel(SessionPhase::Starting);
        let phase_tx = Arc::new(phase_tx);
        let next_id = Arc::new(AtomicU64::new(1));
        let (writer_tx, mut writer_rx) = mpsc::channel::<WriterCommand>(WRITER_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut writer = FrameWriter::new(stdin);
            while let Some(cmd) = writer_rx.recv().await {
                match cmd {
                    WriterCommand::Send(frame) => {
                        if let Err(e) = writer.write_frame(&frame).await {
                            tracing::warn!("analyzer write error: {e}");
                            break;
                        }
                    }
                    WriterCommand::Shutdown => break,
                }
            }
        });

        // stderr is the analyzer's log channel.
        let stderr_event_tx = event_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = stderr_event_tx
                    .send(AnalyzerEvent::Log {
                        level: LogLevel::Debug,
                        message: line,
                    })
                    .await;
            }
        });

        let reader_shared = shared.clone();
        let reader_event_tx = event_tx.clone();
        let reader_writer_tx = writer_tx.clone();
        let reader_phase_tx = phase_tx.clone();
        tokio::spawn(async move {
            let mut reader = FrameReader::new(stdout);
            let reason = loop {
                match reader.read_frame().await {
                    Ok(Some(frame)) => {
                        Self::dispatch_frame(
                            &frame,
                            &reader_shared,
                            &reader_event_tx,
                            &reader_writer_tx,
                        )
                        .await;
                    }
                    Ok(None) => break StopReason::Exited,
                    Err(e) => break StopReason::Failed(e.to_string()),
                }
            };
            Self::enter_stopped(&reader_phase_tx, &reader_shared, &reader_event_tx, reason).await;
        });

        let hs_shared = shared.clone();
        let hs_writer_tx = writer_tx.clone();
        let hs_phase_tx = phase_tx.clone();
        let hs_next_id = next_id.clone();
        let hs_event_tx = event_tx;
        let root_uri = protocol::path_to_file_uri(workspace_root)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| "file:///".to_string());
        let fallback_flags = settings.fallback_flags.clone();
        tokio::spawn(async move {
            let params = protocol::initialize_params(&root_uri, &fallback_flags);
            // Out-of-band: the only request allowed before readiness.
            let outcome = Self::send_request_via(
                &hs_shared,
                &hs_writer_tx,
                &hs_next_id,
                "initialize",
                Some(params),
                INIT_TIMEOUT,
            )
            .await;

            match outcome {
                Ok(_) => {
                    let initialized =
                        protocol::Notification::new("initialized", Some(serde_json::json!({})));
                    let frame = serde_json::to_value(&initialized).expect("static notification");
                    let _ = hs_writer_tx.send(WriterCommand::Send(frame)).await;

                    // Flip to ready and flush the queue under one lock so
                    // no notification can slip between flush and flip.
                    let mut guard = hs_shared.lock().await;
                    hs_phase_tx.send_replace(SessionPhase::Ready);
                    while let Some(frame) = guard.queued.pop_front() {
                        let _ = hs_writer_tx.send(WriterCommand::Send(frame)).await;
                    }
                }
                Err(e) => {
                    tracing::warn!("analyzer handshake failed: {e}");
                    Self::enter_stopped(
                        &hs_phase_tx,
                        &hs_shared,
                        &hs_event_tx,
                        StopReason::HandshakeFailed(e.to_string()),
                    )
                    .await;
                }
            }
        });

        Ok(Self {
            child,
            writer_tx,
            next_id,
            shared,
            phase_tx,
        })
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        *self.phase_tx.subscribe().borrow()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase() == SessionPhase::Ready
    }

    /// Send a request, waiting for readiness first.
    pub async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, AnalyzerError> {
        self.await_ready().await?;
        Self::send_request_via(
            &self.shared,
            &self.writer_tx,
            &self.next_id,
            method,
            Some(params),
            REQUEST_TIMEOUT,
        )
        .await
    }

    /// Send a notification: immediately when ready, queued while starting,
    /// rejected once stopped.
    pub async fn notify(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<(), AnalyzerError> {
        let notification = protocol::Notification::new(method, Some(params));
        let frame = serde_json::to_value(&notification).expect("serializable notification");

        // The shared lock orders this against the handshake's queue flush.
        let mut guard = self.shared.lock().await;
        match self.phase() {
            SessionPhase::Starting => {
                guard.queued.push_back(frame);
                Ok(())
            }
            SessionPhase::Ready => {
                drop(guard);
                self.writer_tx
                    .send(WriterCommand::Send(frame))
                    .await
                    .map_err(|_| AnalyzerError::ChannelClosed)
            }
            SessionPhase::Stopped => Err(AnalyzerError::Stopped),
        }
    }

    /// Graceful stop: best-effort `shutdown` request (ready sessions
    /// only), `exit` notification, then terminate the process and clear
    /// all pending state.
    pub async fn stop(mut self) {
        if self.is_ready() {
            let _ = Self::send_request_via(
                &self.shared,
                &self.writer_tx,
                &self.next_id,
                "shutdown",
                None,
                SHUTDOWN_TIMEOUT,
            )
            .await;
        }

        let exit = protocol::Notification::new("exit", None);
        if let Ok(frame) = serde_json::to_value(&exit) {
            let _ = self.writer_tx.send(WriterCommand::Send(frame)).await;
        }
        let _ = self.writer_tx.send(WriterCommand::Shutdown).await;

        self.phase_tx.send_replace(SessionPhase::Stopped);
        {
            let mut guard = self.shared.lock().await;
            for (_, tx) in guard.pending.drain() {
                let _ = tx.send(Err(AnalyzerError::Stopped));
            }
            guard.queued.clear();
        }

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, self.child.wait())
            .await
            .is_err()
        {
            tracing::debug!("analyzer did not exit in time, killing");
            let _ = self.child.kill().await;
        }
    }

    async fn await_ready(&self) -> Result<(), AnalyzerError> {
        let mut rx = self.phase_tx.subscribe();
        loop {
            match *rx.borrow_and_update() {
                SessionPhase::Ready => return Ok(()),
                SessionPhase::Stopped => return Err(AnalyzerError::Stopped),
                SessionPhase::Starting => {}
            }
            if rx.changed().await.is_err() {
                return Err(AnalyzerError::Stopped);
            }
        }
    }

    async fn send_request_via(
        shared: &Mutex<Shared>,
        writer_tx: &mpsc::Sender<WriterCommand>,
        next_id: &AtomicU64,
        method: &str,
        params: Option<serde_json::Value>,
        timeout: Duration,
    ) -> Result<serde_json::Value, AnalyzerError> {
        let id = next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        shared.lock().await.pending.insert(id, tx);

        let request = protocol::Request::new(id, method, params);
        let frame = serde_json::to_value(&request).expect("serializable request");
        if writer_tx.send(WriterCommand::Send(frame)).await.is_err() {
            shared.lock().await.pending.remove(&id);
            return Err(AnalyzerError::ChannelClosed);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                shared.lock().await.pending.remove(&id);
                Err(AnalyzerError::Exited)
            }
            Err(_) => {
                shared.lock().await.pending.remove(&id);
                Err(AnalyzerError::Timeout)
            }
        }
    }

    async fn enter_stopped(
        phase_tx: &watch::Sender<SessionPhase>,
        shared: &Mutex<Shared>,
        event_tx: &mpsc::Sender<AnalyzerEvent>,
        reason: StopReason,
    ) {
        let already_stopped = {
            let mut guard = shared.lock().await;
            let was = *phase_tx.borrow() == SessionPhase::Stopped;
            phase_tx.send_replace(SessionPhase::Stopped);
            for (_, tx) in guard.pending.drain() {
                let _ = tx.send(Err(AnalyzerError::Exited));
            }
            guard.queued.clear();
            was
        };
        // No events after the first stop.
        if !already_stopped {
            let _ = event_tx.send(AnalyzerEvent::Stopped { reason }).await;
        }
    }

    async fn dispatch_frame(
        frame: &serde_json::Value,
        shared: &Mutex<Shared>,
        event_tx: &mpsc::Sender<AnalyzerEvent>,
        writer_tx: &mpsc::Sender<WriterCommand>,
    ) {
        let Some(incoming) = protocol::classify(frame) else {
            tracing::trace!("ignoring unclassifiable analyzer frame");
            return;
        };

        match incoming {
            Incoming::Response { id, result, error } => {
                let waiter = shared.lock().await.pending.remove(&id);
                if let Some(tx) = waiter {
                    let outcome = match error {
                        Some(e) => Err(AnalyzerError::Rpc {
                            code: e.code,
                            message: e.message,
                        }),
                        None => Ok(result.unwrap_or(serde_json::Value::Null)),
                    };
                    let _ = tx.send(outcome);
                }
            }
            Incoming::ServerRequest { id, method, params } => {
                // Reverse requests must be answered or the analyzer may
                // stall waiting on us.
                let response = Self::stub_response(&id, &method, params.as_ref());
                let _ = writer_tx.send(WriterCommand::Send(response)).await;
            }
            Incoming::Notification { method, params } => {
                Self::handle_notification(&method, params, event_tx).await;
            }
        }
    }

    /// Neutral answers for reverse requests: enough to keep the analyzer
    /// moving, never enough to change its behavior.
    fn stub_response(
        id: &serde_json::Value,
        method: &str,
        params: Option<&serde_json::Value>,
    ) -> serde_json::Value {
        match method {
            "workspace/configuration" => {
                let count = params
                    .and_then(|p| p.get("items"))
                    .and_then(|items| items.as_array())
                    .map_or(1, Vec::len);
                protocol::response_ok(id, serde_json::Value::Array(vec![
                    serde_json::Value::Null;
                    count
                ]))
            }
            "client/registerCapability"
            | "client/unregisterCapability"
            | "window/workDoneProgress/create"
            | "window/showMessageRequest" => protocol::response_ok(id, serde_json::Value::Null),
            "workspace/applyEdit" => {
                protocol::response_ok(id, serde_json::json!({ "applied": false }))
            }
            _ => protocol::response_method_not_found(id, method),
        }
    }

    async fn handle_notification(
        method: &str,
        params: Option<serde_json::Value>,
        event_tx: &mpsc::Sender<AnalyzerEvent>,
    ) {
        match method {
            "textDocument/publishDiagnostics" => {
                let Some(params) = params else { return };
                match serde_json::from_value::<protocol::PublishDiagnosticsParams>(params) {
                    Ok(publish) => {
                        let diagnostics = publish
                            .diagnostics
                            .iter()
                            .map(protocol::WireDiagnostic::to_diagnostic)
                            .collect();
                        let _ = event_tx
                            .send(AnalyzerEvent::Diagnostics {
                                uri: publish.uri,
                                diagnostics,
                            })
                            .await;
                    }
                    Err(e) => {
                        tracing::debug!("unparseable publishDiagnostics from analyzer: {e}");
                    }
                }
            }
            "window/logMessage" | "window/showMessage" => {
                let Some(params) = params else { return };
                let level = params
                    .get("type")
                    .and_then(serde_json::Value::as_u64)
                    .map_or(LogLevel::Debug, LogLevel::from_lsp);
                let message = params
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or_default()
                    .to_string();
                let _ = event_tx.send(AnalyzerEvent::Log { level, message }).await;
            }
            "$/progress" | "telemetry/event" => {}
            other => {
                tracing::trace!("ignoring analyzer notification: {other}");
            }
        }
    }

    #[cfg(test)]
    async fn queued_len(&self) -> usize {
        self.shared.lock().await.queued.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crag_types::Severity;

    fn test_channels() -> (
        Arc<Mutex<Shared>>,
        mpsc::Sender<AnalyzerEvent>,
        mpsc::Receiver<AnalyzerEvent>,
        mpsc::Sender<WriterCommand>,
        mpsc::Receiver<WriterCommand>,
    ) {
        let shared = Arc::new(Mutex::new(Shared {
            pending: HashMap::new(),
            queued: VecDeque::new(),
        }));
        let (event_tx, event_rx) = mpsc::channel(32);
        let (writer_tx, writer_rx) = mpsc::channel(32);
        (shared, event_tx, event_rx, writer_tx, writer_rx)
    }

    fn sent_frame(cmd: WriterCommand) -> serde_json::Value {
        match cmd {
            WriterCommand::Send(frame) => frame,
            WriterCommand::Shutdown => panic!("expected Send, got Shutdown"),
        }
    }

    #[tokio::test]
    async fn response_routes_to_pending_waiter() {
        let (shared, event_tx, _event_rx, writer_tx, _writer_rx) = test_channels();
        let (tx, rx) = oneshot::channel();
        shared.lock().await.pending.insert(1, tx);

        let frame = serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": {"capabilities": {}}});
        AnalyzerSession::dispatch_frame(&frame, &shared, &event_tx, &writer_tx).await;

        let outcome = rx.await.unwrap().unwrap();
        assert!(outcome["capabilities"].is_object());
        assert!(shared.lock().await.pending.is_empty());
    }

    #[tokio::test]
    async fn error_response_rejects_waiter() {
        let (shared, event_tx, _event_rx, writer_tx, _writer_rx) = test_channels();
        let (tx, rx) = oneshot::channel();
        shared.lock().await.pending.insert(2, tx);

        let frame = serde_json::json!({
            "jsonrpc": "2.0", "id": 2,
            "error": {"code": -32602, "message": "invalid params"}
        });
        AnalyzerSession::dispatch_frame(&frame, &shared, &event_tx, &writer_tx).await;

        match rx.await.unwrap() {
            Err(AnalyzerError::Rpc { code, message }) => {
                assert_eq!(code, -32602);
                assert_eq!(message, "invalid params");
            }
            other => panic!("expected rpc error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn response_for_unknown_id_is_ignored() {
        let (shared, event_tx, _event_rx, writer_tx, mut writer_rx) = test_channels();
        let frame = serde_json::json!({"jsonrpc": "2.0", "id": 99, "result": {}});
        AnalyzerSession::dispatch_frame(&frame, &shared, &event_tx, &writer_tx).await;
        assert!(writer_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn configuration_pull_answered_with_per_item_nulls() {
        let (shared, event_tx, _event_rx, writer_tx, mut writer_rx) = test_channels();
        let frame = serde_json::json!({
            "jsonrpc": "2.0", "id": 7, "method": "workspace/configuration",
            "params": {"items": [{"section": "a"}, {"section": "b"}]}
        });
        AnalyzerSession::dispatch_frame(&frame, &shared, &event_tx, &writer_tx).await;

        let response = sent_frame(writer_rx.try_recv().unwrap());
        assert_eq!(response["id"], 7);
        assert_eq!(response["result"], serde_json::json!([null, null]));
    }

    #[tokio::test]
    async fn register_capability_answered_with_null() {
        let (shared, event_tx, _event_rx, writer_tx, mut writer_rx) = test_channels();
        let frame = serde_json::json!({
            "jsonrpc": "2.0", "id": 8, "method": "client/registerCapability", "params": {}
        });
        AnalyzerSession::dispatch_frame(&frame, &shared, &event_tx, &writer_tx).await;

        let response = sent_frame(writer_rx.try_recv().unwrap());
        assert_eq!(response["id"], 8);
        assert_eq!(response["result"], serde_json::Value::Null);
        assert!(response.get("error").is_none());
    }

    #[tokio::test]
    async fn apply_edit_answered_not_applied() {
        let (shared, event_tx, _event_rx, writer_tx, mut writer_rx) = test_channels();
        let frame = serde_json::json!({
            "jsonrpc": "2.0", "id": 9, "method": "workspace/applyEdit", "params": {"edit": {}}
        });
        AnalyzerSession::dispatch_frame(&frame, &shared, &event_tx, &writer_tx).await;

        let response = sent_frame(writer_rx.try_recv().unwrap());
        assert_eq!(response["result"]["applied"], false);
    }

    #[tokio::test]
    async fn unknown_reverse_request_gets_method_not_found() {
        let (shared, event_tx, _event_rx, writer_tx, mut writer_rx) = test_channels();
        let frame = serde_json::json!({
            "jsonrpc": "2.0", "id": 10, "method": "workspace/unknownThing"
        });
        AnalyzerSession::dispatch_frame(&frame, &shared, &event_tx, &writer_tx).await;

        let response = sent_frame(writer_rx.try_recv().unwrap());
        assert_eq!(response["error"]["code"], -32601);
        let msg = response["error"]["message"].as_str().unwrap();
        assert!(msg.contains("workspace/unknownThing"));
    }

    #[tokio::test]
    async fn publish_diagnostics_becomes_event() {
        let (shared, event_tx, mut event_rx, writer_tx, _writer_rx) = test_channels();
        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "textDocument/publishDiagnostics",
            "params": {
                "uri": "file:///src/game.crag",
                "diagnostics": [{
                    "range": {"start": {"line": 4, "character": 0},
                              "end": {"line": 4, "character": 3}},
                    "severity": 1,
                    "message": "unknown type name 'vec'"
                }]
            }
        });
        AnalyzerSession::dispatch_frame(&frame, &shared, &event_tx, &writer_tx).await;

        match event_rx.try_recv().unwrap() {
            AnalyzerEvent::Diagnostics { uri, diagnostics } => {
                assert_eq!(uri, "file:///src/game.crag");
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].severity(), Severity::Error);
                assert_eq!(diagnostics[0].line(), 4);
            }
            other => panic!("expected diagnostics event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn log_message_becomes_log_event() {
        let (shared, event_tx, mut event_rx, writer_tx, _writer_rx) = test_channels();
        let frame = serde_json::json!({
            "jsonrpc": "2.0", "method": "window/logMessage",
            "params": {"type": 2, "message": "indexing"}
        });
        AnalyzerSession::dispatch_frame(&frame, &shared, &event_tx, &writer_tx).await;

        match event_rx.try_recv().unwrap() {
            AnalyzerEvent::Log { level, message } => {
                assert_eq!(level, LogLevel::Warning);
                assert_eq!(message, "indexing");
            }
            other => panic!("expected log event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn progress_and_telemetry_are_ignored() {
        let (shared, event_tx, mut event_rx, writer_tx, mut writer_rx) = test_channels();
        for method in ["$/progress", "telemetry/event"] {
            let frame = serde_json::json!({"jsonrpc": "2.0", "method": method, "params": {}});
            AnalyzerSession::dispatch_frame(&frame, &shared, &event_tx, &writer_tx).await;
        }
        assert!(event_rx.try_recv().is_err());
        assert!(writer_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unclassifiable_frame_is_dropped() {
        let (shared, event_tx, mut event_rx, writer_tx, mut writer_rx) = test_channels();
        let frame = serde_json::json!({"jsonrpc": "2.0"});
        AnalyzerSession::dispatch_frame(&frame, &shared, &event_tx, &writer_tx).await;
        assert!(event_rx.try_recv().is_err());
        assert!(writer_rx.try_recv().is_err());
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn sleeper_settings() -> AnalyzerSettings {
            // A process that never speaks LSP: the session stays in
            // Starting until stopped.
            AnalyzerSettings {
                enabled: true,
                path: "sleep".to_string(),
                args: vec!["30".to_string()],
                ..AnalyzerSettings::default()
            }
        }

        #[tokio::test]
        async fn unresolvable_analyzer_is_not_found() {
            let settings = AnalyzerSettings {
                path: "definitely-not-a-real-analyzer-xyz".to_string(),
                ..AnalyzerSettings::default()
            };
            let (event_tx, _event_rx) = mpsc::channel(8);
            match AnalyzerSession::start(&settings, Path::new("/tmp"), event_tx) {
                Err(AnalyzerError::NotFound { command }) => {
                    assert_eq!(command, "definitely-not-a-real-analyzer-xyz");
                }
                other => panic!("expected NotFound, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn notifications_queue_while_starting() {
            let (event_tx, _event_rx) = mpsc::channel(8);
            let session =
                AnalyzerSession::start(&sleeper_settings(), Path::new("/tmp"), event_tx).unwrap();
            assert_eq!(session.phase(), SessionPhase::Starting);

            session
                .notify("textDocument/didOpen", serde_json::json!({}))
                .await
                .unwrap();
            session
                .notify("textDocument/didChange", serde_json::json!({}))
                .await
                .unwrap();
            assert_eq!(session.queued_len().await, 2);

            session.stop().await;
        }

        #[tokio::test]
        async fn stop_rejects_pending_and_notifications() {
            let (event_tx, _event_rx) = mpsc::channel(8);
            let session =
                AnalyzerSession::start(&sleeper_settings(), Path::new("/tmp"), event_tx).unwrap();

            let shared = session.shared.clone();
            let phase_tx = session.phase_tx.clone();
            session.stop().await;

            assert_eq!(*phase_tx.borrow(), SessionPhase::Stopped);
            assert!(shared.lock().await.pending.is_empty());
        }
    }
}
