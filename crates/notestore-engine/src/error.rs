use std::path::PathBuf;

use notestore_core::DocumentId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage root '{path}' is not accessible")]
    RootInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage root '{0}' is not a directory")]
    RootNotDirectory(PathBuf),

    #[error("save engine for '{0}' has been disposed")]
    Disposed(PathBuf),

    #[error("document '{0}' is not open")]
    UnknownDocument(DocumentId),

    #[error("failed to read document '{id}' from '{path}'")]
    DocumentRead {
        id: DocumentId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write document '{id}' to '{path}'")]
    DocumentWrite {
        id: DocumentId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine construction failed for '{path}': {reason}")]
    Construction { path: PathBuf, reason: String },
}
