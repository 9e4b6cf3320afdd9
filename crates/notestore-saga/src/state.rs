use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Lifecycle state of a transaction step.
///
/// ```text
/// NotStarted -> Executing -> Completed | Failed
/// Completed | Failed -> RollingBack -> RolledBack | RollbackFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepState {
    NotStarted,
    Executing,
    Completed,
    Failed,
    RollingBack,
    RolledBack,
    /// The step could not be undone. The pre-transaction state is no longer
    /// guaranteed and manual intervention is required.
    RollbackFailed,
}

impl StepState {
    #[must_use]
    pub fn can_execute(self) -> bool {
        self == Self::NotStarted
    }

    #[must_use]
    pub fn can_roll_back(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::RolledBack | Self::RollbackFailed
        )
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RollingBack => "rolling back",
            Self::RolledBack => "rolled back",
            Self::RollbackFailed => "rollback failed",
        };
        f.write_str(name)
    }
}

/// Opaque identity of one step instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(Uuid);

impl StepId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single state change of a step.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub step_id: StepId,
    pub description: String,
    pub from: StepState,
    pub to: StepState,
    pub at: DateTime<Utc>,
}

/// Receives step state changes.
///
/// Observers are for progress display and diagnostics; they cannot influence
/// the outcome of a step.
pub trait StepObserver: Send + Sync {
    fn on_transition(&self, transition: &StateTransition);
}

impl<F> StepObserver for F
where
    F: Fn(&StateTransition) + Send + Sync,
{
    fn on_transition(&self, transition: &StateTransition) {
        self(transition);
    }
}
