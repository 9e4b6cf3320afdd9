use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use notestore_core::DocumentId;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::Result;
use crate::engine::{DocumentState, SaveEngine, SaveReport};
use crate::error::EngineError;
use crate::factory::SaveEngineBuilder;

#[derive(Default)]
struct Inner {
    documents: BTreeMap<DocumentId, DocumentState>,
    wal_entries: Vec<String>,
    disposed: bool,
}

/// Save engine that keeps open documents in memory and writes them as plain
/// files below its data root.
pub struct FileSaveEngine {
    root: PathBuf,
    inner: Mutex<Inner>,
}

impl FileSaveEngine {
    /// Bind an engine to an existing directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be inspected or is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let metadata = fs::metadata(&root).map_err(|source| EngineError::RootInaccessible {
            path: root.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(EngineError::RootNotDirectory(root));
        }
        debug!(root = %root.display(), "opened file save engine");
        Ok(Self {
            root,
            inner: Mutex::new(Inner::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_live(&self, inner: &Inner) -> Result<()> {
        if inner.disposed {
            return Err(EngineError::Disposed(self.root.clone()));
        }
        Ok(())
    }

    /// Open a document stored at `relative_path` below the data root.
    ///
    /// A missing file opens as an empty, clean document.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is disposed or the file exists but
    /// cannot be read.
    pub fn open_document(
        &self,
        id: impl Into<DocumentId>,
        relative_path: impl Into<PathBuf>,
    ) -> Result<()> {
        let id = id.into();
        let file_path = relative_path.into();
        let mut inner = self.lock();
        self.ensure_live(&inner)?;

        let absolute = self.root.join(&file_path);
        let content = match fs::read_to_string(&absolute) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(EngineError::DocumentRead {
                    id,
                    path: absolute,
                    source,
                });
            }
        };

        inner.documents.insert(
            id.clone(),
            DocumentState {
                id,
                file_path,
                current_content: content.clone(),
                persisted_content: content,
                dirty: false,
            },
        );
        Ok(())
    }

    /// Replace a document's in-memory content and mark it dirty.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is disposed or the document is not open.
    pub fn edit(&self, id: &DocumentId, content: impl Into<String>) -> Result<()> {
        let mut inner = self.lock();
        self.ensure_live(&inner)?;
        let document = inner
            .documents
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownDocument(id.clone()))?;
        document.current_content = content.into();
        document.dirty = document.current_content != document.persisted_content;
        inner.wal_entries.push(format!("{id}:{}", Uuid::new_v4()));
        Ok(())
    }

    #[must_use]
    pub fn content(&self, id: &DocumentId) -> Option<String> {
        self.lock()
            .documents
            .get(id)
            .map(|d| d.current_content.clone())
    }

    fn write_document(&self, document: &DocumentState) -> Result<()> {
        let path = self.root.join(&document.file_path);
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &document.current_content)
        };
        write().map_err(|source| EngineError::DocumentWrite {
            id: document.id.clone(),
            path: path.clone(),
            source,
        })
    }
}

impl SaveEngine for FileSaveEngine {
    fn data_root(&self) -> &Path {
        &self.root
    }

    fn dirty_document_ids(&self) -> Vec<DocumentId> {
        let inner = self.lock();
        if inner.disposed {
            return Vec::new();
        }
        inner
            .documents
            .values()
            .filter(|d| d.dirty)
            .map(|d| d.id.clone())
            .collect()
    }

    fn save_all_dirty(&self) -> SaveReport {
        let mut inner = self.lock();
        let mut report = SaveReport::default();
        if inner.disposed {
            return report;
        }

        for document in inner.documents.values_mut().filter(|d| d.dirty) {
            match self.write_document(document) {
                Ok(()) => {
                    document.persisted_content = document.current_content.clone();
                    document.dirty = false;
                    report.saved += 1;
                }
                Err(e) => {
                    warn!(document = %document.id, error = %e, "failed to save document");
                    report.failed += 1;
                    report.failed_ids.push(document.id.clone());
                }
            }
        }

        if report.is_complete() {
            inner.wal_entries.clear();
        }
        debug!(
            root = %self.root.display(),
            saved = report.saved,
            failed = report.failed,
            "saved dirty documents"
        );
        report
    }

    fn documents(&self) -> Vec<DocumentState> {
        self.lock().documents.values().cloned().collect()
    }

    fn pending_wal_entries(&self) -> Vec<String> {
        self.lock().wal_entries.clone()
    }

    fn restore_documents(
        &self,
        documents: &[DocumentState],
        wal_entries: &[String],
    ) -> Result<()> {
        let mut inner = self.lock();
        self.ensure_live(&inner)?;
        inner.documents = documents
            .iter()
            .map(|d| (d.id.clone(), d.clone()))
            .collect();
        inner.wal_entries = wal_entries.to_vec();
        Ok(())
    }

    fn dispose(&self) {
        let mut inner = self.lock();
        if !inner.disposed {
            inner.disposed = true;
            debug!(root = %self.root.display(), "disposed file save engine");
        }
    }

    fn is_disposed(&self) -> bool {
        self.lock().disposed
    }
}

/// Builds [`FileSaveEngine`]s for the factory.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSaveEngineBuilder;

impl SaveEngineBuilder for FileSaveEngineBuilder {
    fn build(&self, root: &Path) -> Result<Arc<dyn SaveEngine>> {
        Ok(Arc::new(FileSaveEngine::open(root)?))
    }
}
