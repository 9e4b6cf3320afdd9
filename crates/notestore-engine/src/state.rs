use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use notestore_core::DocumentId;

use crate::engine::{DocumentState, SaveEngine};

/// Snapshot of the active engine, taken right before it is swapped out.
///
/// Holds the engine instance itself so a restore puts back the very same
/// object other components were bound to, along with its document state.
#[derive(Clone)]
pub struct SaveEngineState {
    engine: Arc<dyn SaveEngine>,
    pub data_root: PathBuf,
    pub current_content: BTreeMap<DocumentId, String>,
    pub persisted_content: BTreeMap<DocumentId, String>,
    pub file_paths: BTreeMap<DocumentId, PathBuf>,
    pub dirty: BTreeMap<DocumentId, bool>,
    pub pending_wal_entries: Vec<String>,
    pub captured_at: DateTime<Utc>,
}

impl SaveEngineState {
    pub(crate) fn capture(engine: Arc<dyn SaveEngine>) -> Self {
        let mut state = Self {
            data_root: engine.data_root().to_path_buf(),
            current_content: BTreeMap::new(),
            persisted_content: BTreeMap::new(),
            file_paths: BTreeMap::new(),
            dirty: BTreeMap::new(),
            pending_wal_entries: engine.pending_wal_entries(),
            captured_at: Utc::now(),
            engine,
        };
        for document in state.engine.documents() {
            state
                .current_content
                .insert(document.id.clone(), document.current_content);
            state
                .persisted_content
                .insert(document.id.clone(), document.persisted_content);
            state
                .file_paths
                .insert(document.id.clone(), document.file_path);
            state.dirty.insert(document.id, document.dirty);
        }
        state
    }

    /// The engine this snapshot was captured from.
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn SaveEngine> {
        &self.engine
    }

    #[must_use]
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.file_paths.len()
    }

    /// Reassemble per-document state from the captured maps.
    #[must_use]
    pub fn documents(&self) -> Vec<DocumentState> {
        self.file_paths
            .iter()
            .map(|(id, file_path)| DocumentState {
                id: id.clone(),
                file_path: file_path.clone(),
                current_content: self.current_content.get(id).cloned().unwrap_or_default(),
                persisted_content: self
                    .persisted_content
                    .get(id)
                    .cloned()
                    .unwrap_or_default(),
                dirty: self.dirty.get(id).copied().unwrap_or(false),
            })
            .collect()
    }
}

impl fmt::Debug for SaveEngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveEngineState")
            .field("data_root", &self.data_root)
            .field("documents", &self.file_paths.len())
            .field("pending_wal_entries", &self.pending_wal_entries.len())
            .field("captured_at", &self.captured_at)
            .finish_non_exhaustive()
    }
}
