use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use notestore_core::StorageMode;
use notestore_saga::{StepData, StepId, StepState};
use serde::Serialize;
use uuid::Uuid;

use crate::error::OperationError;

/// Identifies one invocation of a relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Progress of a running relocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionProgress {
    /// Number of steps finished so far.
    pub current_step: usize,
    pub total_steps: usize,
    pub current_operation: String,
    /// Never decreases within one transaction, including during rollback.
    pub percent_complete: f64,
    pub rolling_back: bool,
}

impl TransactionProgress {
    pub(crate) fn new(
        current_step: usize,
        total_steps: usize,
        current_operation: impl Into<String>,
        rolling_back: bool,
    ) -> Self {
        Self {
            current_step,
            total_steps,
            current_operation: current_operation.into(),
            percent_complete: percent(current_step, total_steps),
            rolling_back,
        }
    }
}

fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let done = f64::from(u32::try_from(done.min(total)).unwrap_or(u32::MAX));
    let total = f64::from(u32::try_from(total).unwrap_or(u32::MAX));
    done * 100.0 / total
}

#[derive(Debug, Clone)]
pub struct TransactionStarted {
    pub transaction_id: TransactionId,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub mode: StorageMode,
    pub total_steps: usize,
    pub started_at: DateTime<Utc>,
}

/// Outcome of one executed step, as seen at the end of the transaction.
#[derive(Debug, Clone)]
pub struct StepSummary {
    pub description: String,
    pub success: bool,
    pub error_message: Option<String>,
    pub duration: Duration,
    pub data: StepData,
    /// State after the transaction finished, e.g. `RolledBack`.
    pub final_state: StepState,
}

/// A rollback that failed, reduced to what a caller needs to report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackSummary {
    pub step: String,
    pub description: String,
    pub error_message: String,
}

/// Everything a caller learns about a relocation.
///
/// Business failures are reported here rather than as `Err`.
#[derive(Debug)]
pub struct TransactionResult {
    pub success: bool,
    pub error_message: Option<String>,
    pub error: Option<OperationError>,
    /// Absent when the request was rejected before a transaction began.
    pub transaction_id: Option<TransactionId>,
    pub new_path: PathBuf,
    pub old_path: PathBuf,
    pub mode: StorageMode,
    /// Description of the step that failed.
    pub failed_step: Option<String>,
    pub duration: Duration,
    pub data_migrated: bool,
    /// One entry per executed step, in execution order.
    pub step_results: IndexMap<StepId, StepSummary>,
    pub rollback_failures: Vec<RollbackSummary>,
    /// Human-readable audit trail of executions and rollbacks.
    pub audit_summary: String,
}

impl TransactionResult {
    pub(crate) fn rejected(
        new_path: PathBuf,
        old_path: PathBuf,
        mode: StorageMode,
        error: OperationError,
    ) -> Self {
        Self {
            success: false,
            error_message: Some(error.to_string()),
            error: Some(error),
            transaction_id: None,
            new_path,
            old_path,
            mode,
            failed_step: None,
            duration: Duration::ZERO,
            data_migrated: false,
            step_results: IndexMap::new(),
            rollback_failures: Vec::new(),
            audit_summary: String::new(),
        }
    }

    /// Summary of the executed step with the given description.
    #[must_use]
    pub fn step(&self, description: &str) -> Option<&StepSummary> {
        self.step_results
            .values()
            .find(|s| s.description == description)
    }

    /// Whether the system is known to be in a consistent state: either the
    /// relocation succeeded or every rollback did.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.rollback_failures.is_empty()
    }
}
