//! Events and errors surfaced by the analyzer session.

use crag_types::Diagnostic;

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("analyzer executable not found: {command}")]
    NotFound { command: String },
    #[error("failed to spawn analyzer {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("analyzer session is stopped")]
    Stopped,
    #[error("analyzer process exited with the request in flight")]
    Exited,
    #[error("analyzer request timed out")]
    Timeout,
    #[error("analyzer I/O channel closed")]
    ChannelClosed,
    #[error("analyzer returned error {code}: {message}")]
    Rpc { code: i64, message: String },
}

/// Severity of a log notification forwarded from the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    /// LSP `MessageType`: 1=Error, 2=Warning, 3=Info, 4=Log.
    #[must_use]
    pub fn from_lsp(value: u64) -> Self {
        match value {
            1 => Self::Error,
            2 => Self::Warning,
            3 => Self::Info,
            _ => Self::Debug,
        }
    }
}

/// Why a session left the running state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Process closed its stdout cleanly.
    Exited,
    /// The `initialize` handshake failed.
    HandshakeFailed(String),
    /// Read failure or abnormal termination.
    Failed(String),
}

/// Events emitted by a running session, drained by a single consumer.
#[derive(Debug)]
pub enum AnalyzerEvent {
    /// `textDocument/publishDiagnostics` arrived for a document.
    Diagnostics {
        uri: String,
        diagnostics: Vec<Diagnostic>,
    },
    /// A log or show-message notification from the analyzer.
    Log { level: LogLevel, message: String },
    /// The session transitioned to stopped.
    Stopped { reason: StopReason },
}
