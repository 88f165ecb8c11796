//! Duplex JSON-RPC client for the external analyzer.
//!
//! The analyzer (a general-purpose C/C++ language server such as clangd)
//! runs as a child process speaking LSP base-protocol framing over stdio.
//! This crate owns that conversation: framing, request/response
//! correlation, the pre-handshake notification queue, server-initiated
//! reverse requests, and session lifecycle. Consumers drain an
//! [`AnalyzerEvent`] channel rather than registering callbacks.

pub mod codec;
pub mod manager;
pub mod protocol;
pub mod session;
pub mod types;

pub use manager::AnalyzerManager;
pub use session::{AnalyzerSession, SessionPhase};
pub use types::{AnalyzerError, AnalyzerEvent, LogLevel, StopReason};
