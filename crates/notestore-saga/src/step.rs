use crate::result::StepData;

/// A unit of work that can be executed and, optionally, undone.
///
/// Implementations hold their collaborators and any state captured during
/// `execute()` that `rollback()` needs; a step instance is used for exactly
/// one transaction. Lifecycle bookkeeping, timing, logging and panic
/// containment are provided by [`TrackedStep`](crate::TrackedStep), so
/// implementations only contain the domain logic.
pub trait TransactionStep: Send {
    /// Error type for step failures.
    type Error;

    /// Human-readable description for logging, progress and error reports.
    fn description(&self) -> &str;

    /// Whether this step can be undone. Fixed per step type.
    fn can_rollback(&self) -> bool {
        true
    }

    /// Execute the step.
    ///
    /// The returned data is attached to the step's result.
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails to complete.
    fn execute(&mut self) -> Result<StepData, Self::Error>;

    /// Undo the step's effects.
    ///
    /// Called when a later step fails. The default implementation is a no-op,
    /// suitable for steps that mutate nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the effects could not be undone.
    fn rollback(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Human-readable description of what rollback will do.
    fn rollback_description(&self) -> String {
        format!("undo {}", self.description())
    }
}
