//! tower-lsp front-end: lifecycle, document sync, and the per-request
//! handlers that answer locally or arbitrate with the analyzer session.
//!
//! Routing per analyzer mode:
//! - `proxy`: delegate requests to the analyzer and use its answer,
//!   falling back to the local tag-based answer when delegation fails;
//! - `augment`: merge analyzer and local answers (completion, hover);
//!   other requests answer locally;
//! - `disabled` (or session not ready): local answers only.
//!
//! Semantic tokens always answer locally: a delegated response would be
//! encoded against the analyzer's legend, not the one we advertised.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, mpsc};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crag_analyzer::{AnalyzerEvent, AnalyzerManager, LogLevel, protocol};
use crag_config::SettingsResolver;
use crag_toolchain::{CompilerRunner, resolve_compiler};
use crag_types::{AnalyzerMode, Settings, SettingsOverlay};

use crate::analysis;
use crate::completion;
use crate::document::DocumentStore;
use crate::hover;
use crate::lint;
use crate::reconcile::{self, DocumentTracker};
use crate::semantic;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Which document lifecycle event asked for validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Open,
    Change,
    Save,
}

pub struct CragServer {
    client: Client,
    documents: Arc<DocumentStore>,
    tracker: Arc<DocumentTracker>,
    resolver: Arc<Mutex<SettingsResolver>>,
    analyzer: Arc<RwLock<AnalyzerManager>>,
    runner: CompilerRunner,
    workspace_root: std::sync::RwLock<PathBuf>,
    /// Taken once by the event pump on `initialized`.
    event_rx: std::sync::Mutex<Option<mpsc::Receiver<AnalyzerEvent>>>,
}

impl CragServer {
    #[must_use]
    pub fn new(client: Client) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client,
            documents: Arc::new(DocumentStore::new()),
            tracker: Arc::new(DocumentTracker::new()),
            resolver: Arc::new(Mutex::new(SettingsResolver::new())),
            analyzer: Arc::new(RwLock::new(AnalyzerManager::new(event_tx))),
            runner: CompilerRunner::new(),
            workspace_root: std::sync::RwLock::new(PathBuf::from(".")),
            event_rx: std::sync::Mutex::new(Some(event_rx)),
        }
    }

    fn doc_path(uri: &Url) -> PathBuf {
        uri.to_file_path()
            .unwrap_or_else(|()| PathBuf::from(uri.path()))
    }

    async fn settings_for(&self, path: &Path) -> Settings {
        self.resolver.lock().await.settings_for(path)
    }

    fn workspace_root(&self) -> PathBuf {
        self.workspace_root.read().expect("root lock").clone()
    }

    /// Drain analyzer events for the life of the session. Analyzer
    /// diagnostics are generation-stamped before the (asynchronous)
    /// settings lookup; by store time a newer arrival may have
    /// superseded this one, in which case nothing is published.
    fn spawn_event_pump(&self) {
        let Some(mut event_rx) = self.event_rx.lock().expect("event_rx lock").take() else {
            return;
        };
        let client = self.client.clone();
        let documents = self.documents.clone();
        let tracker = self.tracker.clone();
        let resolver = self.resolver.clone();

        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                match event {
                    AnalyzerEvent::Diagnostics { uri, diagnostics } => {
                        let Some(generation) = tracker.begin_analyzer_update(&uri) else {
                            continue; // not an open document (e.g. a header)
                        };
                        let Ok(url) = Url::parse(&uri) else { continue };
                        let Some(text) = documents.text(&url) else { continue };

                        let settings = resolver
                            .lock()
                            .await
                            .settings_for(&Self::doc_path(&url));
                        let filtered = reconcile::apply_diagnostics_mode(
                            settings.analyzer.diagnostics_mode,
                            diagnostics,
                            &text,
                        );
                        if let Some(publish_set) = tracker.store_analyzer(
                            &uri,
                            generation,
                            filtered,
                            settings.max_problems.0,
                        ) {
                            let version = documents.version(&url);
                            let lsp = publish_set.iter().map(to_lsp_diagnostic).collect();
                            client.publish_diagnostics(url, lsp, version).await;
                        }
                    }
                    AnalyzerEvent::Log { level, message } => {
                        let message_type = match level {
                            LogLevel::Error => MessageType::ERROR,
                            LogLevel::Warning => MessageType::WARNING,
                            LogLevel::Info => MessageType::INFO,
                            LogLevel::Debug => MessageType::LOG,
                        };
                        client.log_message(message_type, message).await;
                    }
                    AnalyzerEvent::Stopped { reason } => {
                        tracing::info!(?reason, "analyzer session stopped");
                    }
                }
            }
        });
    }

    /// Start/stop/restart the analyzer session to match the settings.
    async fn reevaluate_analyzer(&self, settings: &Settings) {
        let compiler_available =
            settings.compiler.enabled && resolve_compiler(&settings.compiler).is_some();
        let root = self.workspace_root();
        self.analyzer
            .write()
            .await
            .reconfigure(settings, &root, compiler_available)
            .await;
    }

    /// Forward a document-sync notification; queued by the session if the
    /// handshake is still in flight, dropped if there is no session.
    async fn forward_notification(&self, method: &str, params: serde_json::Value) {
        let guard = self.analyzer.read().await;
        if let Some(session) = guard.session()
            && let Err(e) = session.notify(method, params).await
        {
            tracing::debug!("dropping analyzer notification {method}: {e}");
        }
    }

    /// Delegate a request to a ready analyzer session.
    async fn delegate<P: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Option<R> {
        let params = serde_json::to_value(params).ok()?;
        let guard = self.analyzer.read().await;
        let session = guard.session()?;
        if !session.is_ready() {
            return None;
        }
        match session.request(method, params).await {
            Ok(value) => serde_json::from_value(value).ok(),
            Err(e) => {
                tracing::debug!("analyzer delegation failed for {method}: {e}");
                None
            }
        }
    }

    /// Whether requests may be routed to the analyzer at all.
    fn delegation_mode(settings: &Settings) -> AnalyzerMode {
        if settings.analyzer.enabled {
            settings.analyzer.mode
        } else {
            AnalyzerMode::Disabled
        }
    }

    async fn validate(&self, uri: Url, trigger: Trigger) {
        let path = Self::doc_path(&uri);
        let settings = self.settings_for(&path).await;

        let (run_lint, run_compiler) = match trigger {
            // Opening always lints; the compiler follows the save gate.
            Trigger::Open => (true, settings.triggers.on_save),
            Trigger::Change => (settings.triggers.on_type, settings.triggers.on_type),
            Trigger::Save => (settings.triggers.on_save, settings.triggers.on_save),
        };
        if !run_lint && !run_compiler {
            return;
        }

        // Snapshot text and version before any suspension point: results
        // are stamped with the version validation started at.
        let Some(text) = self.documents.text(&uri) else {
            return;
        };
        let Some(version) = self.documents.version(&uri) else {
            return;
        };

        let mut local = if run_lint { lint::check(&text) } else { Vec::new() };
        if run_compiler {
            local.extend(self.runner.run(&path, &text, &settings).await);
        }

        if let Some(publish_set) =
            self.tracker
                .store_local(uri.as_str(), version, local, settings.max_problems.0)
        {
            let lsp = publish_set.iter().map(to_lsp_diagnostic).collect();
            self.client
                .publish_diagnostics(uri, lsp, Some(version))
                .await;
        }
    }

    fn line_prefix(text: &str, position: Position) -> String {
        text.lines()
            .nth(position.line as usize)
            .map(|line| {
                line.chars()
                    .take(position.character as usize)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

fn to_lsp_diagnostic(diagnostic: &crag_types::Diagnostic) -> Diagnostic {
    let start = Position::new(diagnostic.line(), diagnostic.col());
    let end = Position::new(diagnostic.line(), diagnostic.col() + 1);
    Diagnostic {
        range: Range::new(start, end),
        severity: Some(match diagnostic.severity() {
            crag_types::Severity::Error => DiagnosticSeverity::ERROR,
            crag_types::Severity::Warning => DiagnosticSeverity::WARNING,
            crag_types::Severity::Information => DiagnosticSeverity::INFORMATION,
            crag_types::Severity::Hint => DiagnosticSeverity::HINT,
        }),
        source: Some(diagnostic.origin().label().to_string()),
        message: diagnostic.message().to_string(),
        ..Diagnostic::default()
    }
}

fn hover_contents_to_string(contents: HoverContents) -> Option<String> {
    fn marked(ms: MarkedString) -> String {
        match ms {
            MarkedString::String(s) => s,
            MarkedString::LanguageString(ls) => format!("```{}\n{}\n```", ls.language, ls.value),
        }
    }
    let text = match contents {
        HoverContents::Scalar(ms) => marked(ms),
        HoverContents::Array(parts) => parts
            .into_iter()
            .map(marked)
            .collect::<Vec<_>>()
            .join("\n\n"),
        HoverContents::Markup(markup) => markup.value,
    };
    (!text.trim().is_empty()).then_some(text)
}

fn completion_response_items(response: CompletionResponse) -> Vec<CompletionItem> {
    match response {
        CompletionResponse::Array(items) => items,
        CompletionResponse::List(list) => list.items,
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for CragServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        #[allow(deprecated)]
        let legacy_root = params.root_uri.as_ref().and_then(|u| u.to_file_path().ok());
        let root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|folder| folder.uri.to_file_path().ok())
            .or(legacy_root)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        *self.workspace_root.write().expect("root lock") = root;

        if let Some(options) = params.initialization_options
            && let Ok(overlay) = serde_json::from_value::<SettingsOverlay>(options)
        {
            self.resolver.lock().await.set_client_overlay(Some(overlay));
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(false),
                        })),
                        ..TextDocumentSyncOptions::default()
                    },
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(
                        [".", "\"", "<", "/"].iter().map(ToString::to_string).collect(),
                    ),
                    resolve_provider: Some(false),
                    ..CompletionOptions::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                workspace_symbol_provider: Some(OneOf::Left(true)),
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        SemanticTokensOptions {
                            legend: SemanticTokensLegend {
                                token_types: semantic::legend(),
                                token_modifiers: Vec::new(),
                            },
                            full: Some(SemanticTokensFullOptions::Bool(true)),
                            range: Some(false),
                            ..SemanticTokensOptions::default()
                        },
                    ),
                ),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: "crag-ls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.spawn_event_pump();

        // Pull the initial configuration; clients that don't support the
        // request answer with an error and we keep the other layers.
        let items = vec![ConfigurationItem {
            scope_uri: None,
            section: Some("crag".to_string()),
        }];
        if let Ok(mut values) = self.client.configuration(items).await
            && let Some(value) = values.pop()
            && let Ok(overlay) = serde_json::from_value::<SettingsOverlay>(value)
        {
            self.resolver.lock().await.set_client_overlay(Some(overlay));
        }

        self.client
            .log_message(MessageType::INFO, "crag-ls initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.analyzer.write().await.shutdown().await;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let text = params.text_document.text;
        let version = params.text_document.version;

        self.documents.open(uri.clone(), &text, version);
        self.tracker.track(uri.as_str(), version);

        let settings = self.settings_for(&Self::doc_path(&uri)).await;
        self.reevaluate_analyzer(&settings).await;
        self.forward_notification(
            "textDocument/didOpen",
            protocol::did_open_params(uri.as_str(), version, &text),
        )
        .await;

        self.validate(uri, Trigger::Open).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        let Some(text) = self
            .documents
            .apply_changes(&uri, version, &params.content_changes)
        else {
            return;
        };
        self.tracker.track(uri.as_str(), version);

        self.forward_notification(
            "textDocument/didChange",
            protocol::did_change_params(uri.as_str(), version, &text),
        )
        .await;

        self.validate(uri, Trigger::Change).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        self.forward_notification(
            "textDocument/didSave",
            serde_json::json!({ "textDocument": { "uri": uri.as_str() } }),
        )
        .await;
        self.validate(uri, Trigger::Save).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.close(&uri);

        // The editor must not retain diagnostics for closed documents.
        let empty = self.tracker.close(uri.as_str());
        let lsp = empty.iter().map(to_lsp_diagnostic).collect();
        self.client.publish_diagnostics(uri.clone(), lsp, None).await;

        self.forward_notification(
            "textDocument/didClose",
            protocol::did_close_params(uri.as_str()),
        )
        .await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        // Clients nest our section under "crag"; accept both shapes.
        let raw = params
            .settings
            .get("crag")
            .cloned()
            .unwrap_or(params.settings);
        match serde_json::from_value::<SettingsOverlay>(raw) {
            Ok(overlay) => {
                self.resolver.lock().await.set_client_overlay(Some(overlay));
            }
            Err(e) => {
                tracing::warn!("ignoring malformed configuration push: {e}");
                return;
            }
        }

        let root = self.workspace_root();
        let settings = self.settings_for(&root).await;
        self.reevaluate_analyzer(&settings).await;

        for uri in self.documents.open_uris() {
            self.validate(uri, Trigger::Open).await;
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri.clone();
        let position = params.text_document_position.position;
        let Some(text) = self.documents.text(&uri) else {
            return Ok(None);
        };
        let settings = self.settings_for(&Self::doc_path(&uri)).await;

        let context = completion::completion_context(&Self::line_prefix(&text, position));
        let local = completion::local_items(context, &text);

        match Self::delegation_mode(&settings) {
            AnalyzerMode::Proxy => {
                if let Some(response) = self
                    .delegate::<_, Option<CompletionResponse>>("textDocument/completion", &params)
                    .await
                    .flatten()
                {
                    return Ok(Some(response));
                }
                Ok(Some(CompletionResponse::Array(local)))
            }
            AnalyzerMode::Augment => {
                let analyzer_items = self
                    .delegate::<_, Option<CompletionResponse>>("textDocument/completion", &params)
                    .await
                    .flatten()
                    .map(completion_response_items)
                    .unwrap_or_default();
                Ok(Some(CompletionResponse::Array(completion::merge_items(
                    analyzer_items,
                    local,
                ))))
            }
            AnalyzerMode::Disabled => Ok(Some(CompletionResponse::Array(local))),
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params
            .text_document_position_params
            .text_document
            .uri
            .clone();
        let position = params.text_document_position_params.position;
        let Some(text) = self.documents.text(&uri) else {
            return Ok(None);
        };
        let settings = self.settings_for(&Self::doc_path(&uri)).await;

        let local = analysis::word_at(&text, position.line, position.character)
            .and_then(|word| hover::local_hover(&word, &text));

        let make_hover = |markdown: String| Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: markdown,
            }),
            range: None,
        };

        match Self::delegation_mode(&settings) {
            AnalyzerMode::Proxy => {
                let delegated = self
                    .delegate::<_, Option<Hover>>("textDocument/hover", &params)
                    .await
                    .flatten();
                if delegated.is_some() {
                    return Ok(delegated);
                }
                Ok(local.map(make_hover))
            }
            AnalyzerMode::Augment => {
                let analyzer = self
                    .delegate::<_, Option<Hover>>("textDocument/hover", &params)
                    .await
                    .flatten()
                    .and_then(|h| hover_contents_to_string(h.contents));
                Ok(hover::merge_hover(analyzer, local).map(make_hover))
            }
            AnalyzerMode::Disabled => Ok(local.map(make_hover)),
        }
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params
            .text_document_position_params
            .text_document
            .uri
            .clone();
        let position = params.text_document_position_params.position;
        let Some(text) = self.documents.text(&uri) else {
            return Ok(None);
        };
        let settings = self.settings_for(&Self::doc_path(&uri)).await;

        if Self::delegation_mode(&settings) == AnalyzerMode::Proxy
            && let Some(response) = self
                .delegate::<_, Option<GotoDefinitionResponse>>("textDocument/definition", &params)
                .await
                .flatten()
        {
            return Ok(Some(response));
        }

        let Some(word) = analysis::word_at(&text, position.line, position.character) else {
            return Ok(None);
        };
        let definition = analysis::index_document(&text)
            .into_iter()
            .find(|symbol| symbol.name == word)
            .map(|symbol| {
                let start = Position::new(symbol.line, symbol.col);
                let end = Position::new(symbol.line, symbol.col + word.len() as u32);
                GotoDefinitionResponse::Scalar(Location::new(uri, Range::new(start, end)))
            });
        Ok(definition)
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri.clone();
        let position = params.text_document_position.position;
        let Some(text) = self.documents.text(&uri) else {
            return Ok(None);
        };
        let settings = self.settings_for(&Self::doc_path(&uri)).await;

        if Self::delegation_mode(&settings) == AnalyzerMode::Proxy
            && let Some(locations) = self
                .delegate::<_, Option<Vec<Location>>>("textDocument/references", &params)
                .await
                .flatten()
        {
            return Ok(Some(locations));
        }

        let Some(word) = analysis::word_at(&text, position.line, position.character) else {
            return Ok(None);
        };
        let locations = analysis::occurrences(&text, &word)
            .into_iter()
            .map(|(line, col)| {
                let start = Position::new(line, col);
                let end = Position::new(line, col + word.len() as u32);
                Location::new(uri.clone(), Range::new(start, end))
            })
            .collect();
        Ok(Some(locations))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri.clone();
        let Some(text) = self.documents.text(&uri) else {
            return Ok(None);
        };
        let settings = self.settings_for(&Self::doc_path(&uri)).await;

        if Self::delegation_mode(&settings) == AnalyzerMode::Proxy
            && let Some(response) = self
                .delegate::<_, Option<DocumentSymbolResponse>>(
                    "textDocument/documentSymbol",
                    &params,
                )
                .await
                .flatten()
        {
            return Ok(Some(response));
        }

        let symbols = symbols_for(&uri, &text, None);
        Ok(Some(DocumentSymbolResponse::Flat(symbols)))
    }

    async fn symbol(
        &self,
        params: WorkspaceSymbolParams,
    ) -> Result<Option<Vec<SymbolInformation>>> {
        let query = params.query.to_lowercase();
        let mut symbols = Vec::new();
        for uri in self.documents.open_uris() {
            if let Some(text) = self.documents.text(&uri) {
                symbols.extend(symbols_for(&uri, &text, Some(&query)));
            }
        }
        Ok(Some(symbols))
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let Some(text) = self.documents.text(&params.text_document.uri) else {
            return Ok(None);
        };
        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data: semantic::scan(&text),
        })))
    }
}

fn symbols_for(uri: &Url, text: &str, query: Option<&str>) -> Vec<SymbolInformation> {
    analysis::index_document(text)
        .into_iter()
        .filter(|symbol| {
            query.is_none_or(|q| q.is_empty() || symbol.name.to_lowercase().contains(q))
        })
        .map(|symbol| {
            let start = Position::new(symbol.line, symbol.col);
            let end = Position::new(symbol.line, symbol.col + symbol.name.len() as u32);
            #[allow(deprecated)]
            SymbolInformation {
                name: symbol.name,
                kind: match symbol.kind {
                    analysis::SymbolKind::Function => SymbolKind::FUNCTION,
                    analysis::SymbolKind::Variable => SymbolKind::VARIABLE,
                    analysis::SymbolKind::Macro => SymbolKind::CONSTANT,
                },
                tags: None,
                deprecated: None,
                location: Location::new(uri.clone(), Range::new(start, end)),
                container_name: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crag_types::{DiagnosticOrigin, Severity};

    #[test]
    fn diagnostic_conversion_keeps_position_and_origin() {
        let diag = crag_types::Diagnostic::new(
            Severity::Error,
            "missing semicolon".to_string(),
            2,
            4,
            DiagnosticOrigin::Compiler,
        );
        let lsp = to_lsp_diagnostic(&diag);
        assert_eq!(lsp.range.start, Position::new(2, 4));
        assert_eq!(lsp.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(lsp.source.as_deref(), Some("cragc"));
    }

    #[test]
    fn hover_contents_flattening() {
        let scalar = HoverContents::Scalar(MarkedString::String("hi".into()));
        assert_eq!(hover_contents_to_string(scalar), Some("hi".into()));

        let markup = HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: String::new(),
        });
        assert_eq!(hover_contents_to_string(markup), None);

        let array = HoverContents::Array(vec![
            MarkedString::String("a".into()),
            MarkedString::LanguageString(LanguageString {
                language: "crag".into(),
                value: "vec v;".into(),
            }),
        ]);
        let text = hover_contents_to_string(array).unwrap();
        assert!(text.contains("a"));
        assert!(text.contains("```crag"));
    }

    #[test]
    fn line_prefix_clamps_to_line() {
        let text = "abc\ndef\n";
        assert_eq!(CragServer::line_prefix(text, Position::new(1, 2)), "de");
        assert_eq!(CragServer::line_prefix(text, Position::new(1, 99)), "def");
        assert_eq!(CragServer::line_prefix(text, Position::new(9, 0)), "");
    }

    #[test]
    fn symbols_filter_by_query() {
        let uri = Url::parse("file:///a.crag").unwrap();
        let text = "void touch_trigger() {}\nfloat health;\n";
        let all = symbols_for(&uri, text, None);
        assert_eq!(all.len(), 2);

        let filtered = symbols_for(&uri, text, Some("touch"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "touch_trigger");

        let empty_query = symbols_for(&uri, text, Some(""));
        assert_eq!(empty_query.len(), 2);
    }
}
