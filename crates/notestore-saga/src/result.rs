use std::time::Duration;

use crate::error::StepFailure;
use crate::state::StepId;

/// Step-specific payload attached to a result, e.g. counts or paths.
pub type StepData = serde_json::Value;

/// Outcome of executing or rolling back one step.
///
/// A failed result always carries a non-empty error message.
#[derive(Debug)]
pub struct StepResult<E> {
    step_id: StepId,
    description: String,
    error_message: Option<String>,
    failure: Option<StepFailure<E>>,
    duration: Duration,
    data: StepData,
}

impl<E> StepResult<E> {
    pub(crate) fn succeeded(
        step_id: StepId,
        description: impl Into<String>,
        duration: Duration,
        data: StepData,
    ) -> Self {
        Self {
            step_id,
            description: description.into(),
            error_message: None,
            failure: None,
            duration,
            data,
        }
    }

    pub(crate) fn failed(
        step_id: StepId,
        description: impl Into<String>,
        duration: Duration,
        failure: StepFailure<E>,
    ) -> Self
    where
        E: std::fmt::Display,
    {
        let description = description.into();
        let mut message = failure.to_string();
        if message.trim().is_empty() {
            message = format!("step '{description}' failed");
        }
        Self {
            step_id,
            description,
            error_message: Some(message),
            failure: Some(failure),
            duration,
            data: StepData::Null,
        }
    }

    #[must_use]
    pub fn step_id(&self) -> StepId {
        self.step_id
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error_message.is_none()
    }

    /// The failure message; `None` for successful results.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// The failure cause, unless it has been taken by the transaction error.
    #[must_use]
    pub fn failure(&self) -> Option<&StepFailure<E>> {
        self.failure.as_ref()
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub fn data(&self) -> &StepData {
        &self.data
    }

    pub(crate) fn take_failure(&mut self) -> Option<StepFailure<E>> {
        self.failure.take()
    }
}
