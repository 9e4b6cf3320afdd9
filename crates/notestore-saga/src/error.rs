use thiserror::Error;

use crate::state::{StepId, StepState};

/// Why a step did not succeed.
#[derive(Debug, Error)]
pub enum StepFailure<E> {
    /// The step's own logic returned an error.
    #[error(transparent)]
    Step(E),

    /// The step's logic panicked; the panic was contained at the step boundary.
    #[error("step panicked: {0}")]
    Panicked(String),

    /// The step was asked to act from a state that does not allow it.
    #[error("cannot {action} a step that is {state}")]
    InvalidState {
        action: &'static str,
        state: StepState,
    },

    /// Rollback was requested for a step that cannot be undone.
    #[error("step does not support rollback")]
    RollbackUnsupported,
}

/// Error from a failed rollback.
#[derive(Debug, Error)]
#[error("rollback failed for step '{step}': {description}")]
pub struct RollbackError<E> {
    /// Description of the step whose rollback failed.
    pub step: String,
    pub step_id: StepId,
    /// What the rollback was trying to do.
    pub description: String,
    #[source]
    pub error: StepFailure<E>,
}

/// Error from running a transaction.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransactionError<E> {
    /// A step failed and every rollback succeeded.
    #[error("step '{step}' failed")]
    StepFailed {
        step: String,
        step_id: StepId,
        #[source]
        source: StepFailure<E>,
    },

    /// A step failed and at least one rollback failed as well.
    #[error("step '{failed_step}' failed, and {} rollback(s) also failed", rollback_errors.len())]
    RollbackFailed {
        failed_step: String,
        step_id: StepId,
        step_error: StepFailure<E>,
        rollback_errors: Vec<RollbackError<E>>,
    },
}

impl<E> TransactionError<E> {
    /// Description of the step whose failure aborted the transaction.
    #[must_use]
    pub fn failed_step(&self) -> &str {
        match self {
            Self::StepFailed { step, .. } => step,
            Self::RollbackFailed { failed_step, .. } => failed_step,
        }
    }

    #[must_use]
    pub fn failed_step_id(&self) -> StepId {
        match self {
            Self::StepFailed { step_id, .. } | Self::RollbackFailed { step_id, .. } => *step_id,
        }
    }

    #[must_use]
    pub fn step_error(&self) -> &StepFailure<E> {
        match self {
            Self::StepFailed { source, .. } => source,
            Self::RollbackFailed { step_error, .. } => step_error,
        }
    }

    #[must_use]
    pub fn rollback_errors(&self) -> &[RollbackError<E>] {
        match self {
            Self::StepFailed { .. } => &[],
            Self::RollbackFailed {
                rollback_errors, ..
            } => rollback_errors,
        }
    }
}
