use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage path is empty")]
    EmptyPath,

    #[error("storage path '{path}' is invalid: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("unknown storage mode '{0}'")]
    UnknownStorageMode(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
