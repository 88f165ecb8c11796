//! The `crag-ls` language server.
//!
//! Serves LSP to the editor, arbitrating between three diagnostic
//! producers: the in-process lint pass, the `cragc` compiler runner, and
//! the external analyzer session. The reconciler guarantees the editor
//! only ever sees the deduplicated union of the *current* results from
//! each source.

pub mod analysis;
pub mod backend;
pub mod completion;
pub mod document;
pub mod hover;
pub mod lang;
pub mod lint;
pub mod reconcile;
pub mod semantic;

pub use backend::CragServer;
