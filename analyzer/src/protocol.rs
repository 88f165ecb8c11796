//! JSON-RPC message types and LSP payload builders for the analyzer
//! conversation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crag_types::{Diagnostic, DiagnosticOrigin, Severity};

#[derive(Debug, thiserror::Error)]
#[error("cannot convert path to file URI: {}", path.display())]
pub struct PathToUriError {
    path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct Request {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    #[must_use]
    pub fn new(id: u64, method: &str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Notification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    #[must_use]
    pub fn new(method: &str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.to_string(),
            params,
        }
    }
}

/// Classified inbound frame.
#[derive(Debug)]
pub enum Incoming {
    /// A response to one of our requests.
    Response {
        id: u64,
        result: Option<serde_json::Value>,
        error: Option<RpcError>,
    },
    /// A server-initiated reverse request; MUST be answered.
    ServerRequest {
        id: serde_json::Value,
        method: String,
        params: Option<serde_json::Value>,
    },
    /// A notification; no reply expected.
    Notification {
        method: String,
        params: Option<serde_json::Value>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Classify a frame by the id/method/result shape JSON-RPC defines.
/// Returns `None` for frames that are none of the three (logged and
/// dropped by the caller).
#[must_use]
pub fn classify(frame: &serde_json::Value) -> Option<Incoming> {
    let id = frame.get("id");
    let method = frame
        .get("method")
        .and_then(|m| m.as_str())
        .map(String::from);
    let has_outcome = frame.get("result").is_some() || frame.get("error").is_some();

    match (id, method, has_outcome) {
        (Some(id), None, true) => Some(Incoming::Response {
            id: id.as_u64()?,
            result: frame.get("result").cloned(),
            error: frame
                .get("error")
                .and_then(|e| serde_json::from_value(e.clone()).ok()),
        }),
        (Some(id), Some(method), _) => Some(Incoming::ServerRequest {
            id: id.clone(),
            method,
            params: frame.get("params").cloned(),
        }),
        (None, Some(method), _) => Some(Incoming::Notification {
            method,
            params: frame.get("params").cloned(),
        }),
        _ => None,
    }
}

/// Successful reply to a server-initiated reverse request.
#[must_use]
pub fn response_ok(id: &serde_json::Value, result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

/// `MethodNotFound` reply for reverse requests we do not model.
#[must_use]
pub fn response_method_not_found(id: &serde_json::Value, method: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": -32601, "message": format!("Method not found: {method}") }
    })
}

/// The `initialize` payload. `fallback_flags` rides in
/// `initializationOptions.fallbackFlags` for analyzers that accept
/// compile flags without a compilation database.
#[must_use]
pub fn initialize_params(root_uri: &str, fallback_flags: &[String]) -> serde_json::Value {
    serde_json::json!({
        "processId": std::process::id(),
        "rootUri": root_uri,
        "capabilities": {
            "textDocument": {
                "synchronization": {
                    "dynamicRegistration": false,
                    "willSave": false,
                    "willSaveWaitUntil": false,
                    "didSave": true
                },
                "publishDiagnostics": {
                    "relatedInformation": false
                },
                "completion": {
                    "completionItem": { "snippetSupport": false }
                },
                "hover": {
                    "contentFormat": ["markdown", "plaintext"]
                }
            }
        },
        "initializationOptions": {
            "fallbackFlags": fallback_flags
        },
        "workspaceFolders": [{
            "uri": root_uri,
            "name": "workspace"
        }]
    })
}

#[must_use]
pub fn did_open_params(uri: &str, version: i32, text: &str) -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "uri": uri,
            "languageId": "c",
            "version": version,
            "text": text
        }
    })
}

#[must_use]
pub fn did_change_params(uri: &str, version: i32, text: &str) -> serde_json::Value {
    serde_json::json!({
        "textDocument": { "uri": uri, "version": version },
        "contentChanges": [{ "text": text }]
    })
}

#[must_use]
pub fn did_close_params(uri: &str) -> serde_json::Value {
    serde_json::json!({ "textDocument": { "uri": uri } })
}

#[derive(Debug, Deserialize)]
pub struct PublishDiagnosticsParams {
    pub uri: String,
    pub diagnostics: Vec<WireDiagnostic>,
}

#[derive(Debug, Deserialize)]
pub struct WireDiagnostic {
    pub range: WireRange,
    pub severity: Option<u64>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct WireRange {
    pub start: WirePosition,
}

#[derive(Debug, Deserialize)]
pub struct WirePosition {
    pub line: u32,
    pub character: u32,
}

impl WireDiagnostic {
    /// Analyzer positions are already 0-based; no conversion here.
    #[must_use]
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(
            self.severity
                .and_then(Severity::from_lsp)
                .unwrap_or(Severity::Warning),
            self.message.clone(),
            self.range.start.line,
            self.range.start.character,
            DiagnosticOrigin::Analyzer,
        )
    }
}

pub fn path_to_file_uri(path: &Path) -> Result<url::Url, PathToUriError> {
    url::Url::from_file_path(path).map_err(|()| PathToUriError {
        path: path.to_path_buf(),
    })
}

#[must_use]
pub fn file_uri_to_path(uri: &str) -> Option<PathBuf> {
    url::Url::parse(uri)
        .ok()
        .and_then(|u| u.to_file_path().ok())
}
