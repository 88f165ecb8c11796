//! `crag-ls` entry point: LSP over stdio.

use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use crag_server::CragServer;

/// Logs go to stderr only — stdout carries protocol frames, and a single
/// stray line there corrupts the session.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "crag-ls starting");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(CragServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
