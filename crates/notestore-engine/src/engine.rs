use std::path::{Path, PathBuf};

use notestore_core::DocumentId;

use crate::Result;

/// Observable state of one open document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentState {
    pub id: DocumentId,
    /// Path of the document file, relative to the engine's data root.
    pub file_path: PathBuf,
    pub current_content: String,
    pub persisted_content: String,
    pub dirty: bool,
}

/// Outcome of saving every dirty document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: usize,
    pub failed_ids: Vec<DocumentId>,
}

impl SaveReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Persists open documents below a data root.
///
/// Engines are shared behind `Arc` and must be internally synchronized.
pub trait SaveEngine: Send + Sync {
    /// Directory this engine reads and writes documents under.
    fn data_root(&self) -> &Path;

    /// Documents with unsaved changes. Never fails: an empty list means
    /// nothing is dirty.
    fn dirty_document_ids(&self) -> Vec<DocumentId>;

    /// Save every dirty document, reporting per-document failures.
    fn save_all_dirty(&self) -> SaveReport;

    /// Snapshot of every open document.
    fn documents(&self) -> Vec<DocumentState>;

    /// Identifiers of write-ahead-log entries not yet folded into saved files.
    fn pending_wal_entries(&self) -> Vec<String>;

    /// Replace the in-memory document state with a previously captured one.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine has been disposed.
    fn restore_documents(&self, documents: &[DocumentState], wal_entries: &[String])
    -> Result<()>;

    /// Release the engine. Further saves fail; dirty queries return nothing.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}
