use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("storage operation failed")]
    Operation(#[from] notestore_operations::OperationError),

    #[error("save engine error")]
    Engine(#[from] notestore_engine::EngineError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("no storage location configured in '{0}'")]
    NoStorageRoot(PathBuf),

    #[error("'{0}' is not a usable storage location")]
    InvalidLocation(PathBuf),

    #[error("could not relocate storage to '{path}'")]
    RelocationFailed {
        path: PathBuf,
        #[source]
        source: Option<notestore_operations::OperationError>,
    },
}

pub type Result<T> = std::result::Result<T, CliError>;
