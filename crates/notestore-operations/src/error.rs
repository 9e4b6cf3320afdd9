use std::path::PathBuf;

use notestore_core::DocumentId;
use notestore_saga::{StepFailure, TransactionError};
use thiserror::Error;

/// A rollback that failed while unwinding a relocation.
#[derive(Debug)]
pub struct RollbackFailure {
    /// Description of the step whose rollback failed.
    pub step: String,
    /// What the rollback was trying to do.
    pub description: String,
    pub error: Box<OperationError>,
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Core(#[from] notestore_core::CoreError),

    #[error(transparent)]
    Engine(#[from] notestore_engine::EngineError),

    #[error("storage path is empty")]
    EmptyPath,

    #[error("storage location '{path}' failed validation: {}", errors.join("; "))]
    ValidationFailed { path: PathBuf, errors: Vec<String> },

    #[error("storage location '{path}' is not writable")]
    NotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write probe in '{path}' did not finish within {timeout_ms} ms")]
    WriteProbeTimedOut { path: PathBuf, timeout_ms: u64 },

    #[error(
        "not enough free space at '{path}': {available_mb} MB available, {required_mb} MB required"
    )]
    InsufficientSpace {
        path: PathBuf,
        available_mb: u64,
        required_mb: u64,
    },

    #[error("failed to query free space at '{path}'")]
    DiskSpaceQuery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory '{path}'")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("new save engine at '{0}' is not usable")]
    EngineNotUsable(PathBuf),

    #[error("no save engine was prepared for activation")]
    EngineNotPrepared,

    #[error("failed to save {} dirty document(s): {}", failed.len(), join_ids(failed))]
    FlushFailed { failed: Vec<DocumentId> },

    #[error("active save engine is still bound to '{actual}' instead of '{expected}'")]
    SwapNotVisible { expected: PathBuf, actual: PathBuf },

    #[error("failed to read configuration file '{path}'")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write configuration file '{path}'")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file '{path}'")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize configuration for '{path}'")]
    ConfigSerialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("invalid watch filter '{pattern}'")]
    WatchFilter {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to watch '{path}'")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to copy '{path}'")]
    MigrationCopy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove '{path}'")]
    MigrationRemove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{component} points at '{actual}' instead of '{expected}'")]
    Inconsistent {
        component: &'static str,
        expected: PathBuf,
        actual: String,
    },

    #[error("step panicked: {0}")]
    StepPanicked(String),

    #[error("cannot {action} a step that is {state}")]
    InvalidStepState {
        action: &'static str,
        state: notestore_saga::StepState,
    },

    #[error("step does not support rollback")]
    RollbackUnsupported,

    #[error("unexpected failure: {0}")]
    Unexpected(String),

    /// A step failed and could not undo its own partial work.
    #[error("could not {undo} after the step failed: {undo_error}")]
    PartialUndoFailed {
        source: Box<OperationError>,
        /// What the undo was trying to do.
        undo: String,
        undo_error: Box<OperationError>,
    },

    #[error("storage relocation failed at step '{step}'")]
    TransactionFailed {
        step: String,
        #[source]
        source: Box<OperationError>,
    },

    #[error(
        "storage relocation failed at step '{step}' and {} rollback(s) also failed",
        rollback_failures.len()
    )]
    RollbackFailed {
        step: String,
        #[source]
        source: Box<OperationError>,
        rollback_failures: Vec<RollbackFailure>,
    },
}

pub type Result<T> = std::result::Result<T, OperationError>;

fn join_ids(ids: &[DocumentId]) -> String {
    ids.iter()
        .map(DocumentId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl OperationError {
    /// Attach a failed undo of the step's own partial work to `self`.
    #[must_use]
    pub fn with_failed_undo(self, undo: impl Into<String>, undo_error: OperationError) -> Self {
        Self::PartialUndoFailed {
            source: Box::new(self),
            undo: undo.into(),
            undo_error: Box::new(undo_error),
        }
    }

    /// The root cause of a transaction error, or the error itself.
    #[must_use]
    pub fn root_cause(&self) -> &OperationError {
        match self {
            Self::TransactionFailed { source, .. }
            | Self::RollbackFailed { source, .. }
            | Self::PartialUndoFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The undo a failed step attempted on its own partial work, if that
    /// undo failed too.
    #[must_use]
    pub fn failed_undo(&self) -> Option<(&str, &OperationError)> {
        match self {
            Self::PartialUndoFailed {
                undo, undo_error, ..
            } => Some((undo, undo_error)),
            Self::TransactionFailed { source, .. } | Self::RollbackFailed { source, .. } => {
                source.failed_undo()
            }
            _ => None,
        }
    }
}

impl From<StepFailure<OperationError>> for OperationError {
    fn from(failure: StepFailure<OperationError>) -> Self {
        match failure {
            StepFailure::Step(error) => error,
            StepFailure::Panicked(message) => Self::StepPanicked(message),
            StepFailure::InvalidState { action, state } => Self::InvalidStepState { action, state },
            StepFailure::RollbackUnsupported => Self::RollbackUnsupported,
        }
    }
}

impl From<TransactionError<OperationError>> for OperationError {
    fn from(err: TransactionError<OperationError>) -> Self {
        match err {
            TransactionError::StepFailed { step, source, .. } => Self::TransactionFailed {
                step,
                source: Box::new(source.into()),
            },
            TransactionError::RollbackFailed {
                failed_step,
                step_error,
                rollback_errors,
                ..
            } => {
                let rollback_failures = rollback_errors
                    .into_iter()
                    .map(|e| RollbackFailure {
                        step: e.step,
                        description: e.description,
                        error: Box::new(e.error.into()),
                    })
                    .collect();
                Self::RollbackFailed {
                    step: failed_step,
                    source: Box::new(step_error.into()),
                    rollback_failures,
                }
            }
            _ => Self::Unexpected("unrecognized transaction failure".to_string()),
        }
    }
}
