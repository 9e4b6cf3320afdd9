use std::fmt::Display;
use std::sync::Arc;

use tracing::debug;

use crate::audit::{AuditStatus, TransactionAuditLog};
use crate::error::{RollbackError, TransactionError};
use crate::notify::notify_contained;
use crate::result::StepResult;
use crate::state::{StepObserver, StepState};
use crate::tracked::TrackedStep;

/// Progress of a running transaction, reported before and after every step
/// and before every rollback.
#[derive(Debug, Clone, Copy)]
pub struct RunProgress<'a> {
    /// Number of steps that have finished executing successfully.
    pub completed: usize,
    pub total: usize,
    /// Description of the step being worked on.
    pub operation: &'a str,
    pub rolling_back: bool,
}

/// Everything that happened during one run of a transaction.
#[derive(Debug)]
pub struct TransactionRun<E> {
    /// Execution results in execution order, including the failing step.
    ///
    /// The failing step's result keeps its message; its failure cause moves
    /// into `outcome`.
    pub results: Vec<StepResult<E>>,
    /// Rollback results in rollback order.
    pub rollbacks: Vec<StepResult<E>>,
    pub outcome: Result<(), TransactionError<E>>,
    pub audit_log: TransactionAuditLog,
}

impl<E> TransactionRun<E> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// An ordered sequence of steps ready to run.
///
/// Steps execute strictly in order. If a step fails, the steps that already
/// completed are rolled back in reverse completion order (LIFO); steps that
/// cannot be rolled back are left in place.
pub struct Transaction<E> {
    steps: Vec<TrackedStep<E>>,
}

impl<E> Transaction<E>
where
    E: Display,
{
    pub(crate) fn from_steps(steps: Vec<TrackedStep<E>>) -> Self {
        Self { steps }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn steps(&self) -> &[TrackedStep<E>] {
        &self.steps
    }

    #[must_use]
    pub fn states(&self) -> Vec<StepState> {
        self.steps.iter().map(TrackedStep::state).collect()
    }

    /// Register an observer on every step.
    pub fn subscribe(&mut self, observer: &Arc<dyn StepObserver>) {
        for step in &mut self.steps {
            step.subscribe(Arc::clone(observer));
        }
    }

    /// Run every step in order, rolling back on the first failure.
    ///
    /// Never panics on step failure; the outcome is reported in the returned
    /// [`TransactionRun`].
    ///
    /// # Panics
    ///
    /// Panics if a failed step result does not carry its failure, which the
    /// tracking wrapper never produces.
    pub fn run(&mut self, mut progress: impl FnMut(&RunProgress<'_>)) -> TransactionRun<E> {
        let total = self.steps.len();
        let mut audit_log = TransactionAuditLog::new();
        let mut results = Vec::with_capacity(total);
        let mut completed: Vec<usize> = Vec::with_capacity(total);

        for index in 0..total {
            let step = &mut self.steps[index];
            report(&mut progress, &RunProgress {
                completed: index,
                total,
                operation: step.description(),
                rolling_back: false,
            });

            audit_log.record_start(step.id(), step.description());
            let mut result = step.execute();

            if result.is_success() {
                audit_log.record_success(
                    step.can_rollback()
                        .then(|| step.rollback_description()),
                );
                completed.push(index);
                results.push(result);
                report(&mut progress, &RunProgress {
                    completed: index + 1,
                    total,
                    operation: self.steps[index].description(),
                    rolling_back: false,
                });
                continue;
            }

            audit_log.record_failure();
            let step_error = result
                .take_failure()
                .expect("failed step result carries its failure");
            let failed_step = step.description().to_string();
            let step_id = step.id();
            results.push(result);

            let (rollbacks, rollback_errors) =
                self.roll_back(&completed, index, &mut audit_log, &mut progress);

            let outcome = if rollback_errors.is_empty() {
                Err(TransactionError::StepFailed {
                    step: failed_step,
                    step_id,
                    source: step_error,
                })
            } else {
                Err(TransactionError::RollbackFailed {
                    failed_step,
                    step_id,
                    step_error,
                    rollback_errors,
                })
            };

            return TransactionRun {
                results,
                rollbacks,
                outcome,
                audit_log,
            };
        }

        TransactionRun {
            results,
            rollbacks: Vec::new(),
            outcome: Ok(()),
            audit_log,
        }
    }

    fn roll_back(
        &mut self,
        completed: &[usize],
        progress_mark: usize,
        audit_log: &mut TransactionAuditLog,
        progress: &mut impl FnMut(&RunProgress<'_>),
    ) -> (Vec<StepResult<E>>, Vec<RollbackError<E>>) {
        let total = self.steps.len();
        let mut rollbacks = Vec::new();
        let mut rollback_errors = Vec::new();

        for &index in completed.iter().rev() {
            let step = &mut self.steps[index];
            if !step.can_rollback() {
                debug!(step = %step.description(), "step cannot be rolled back, leaving in place");
                audit_log.record_rollback(step.id(), AuditStatus::RollbackSkipped);
                continue;
            }

            report(progress, &RunProgress {
                completed: progress_mark,
                total,
                operation: step.description(),
                rolling_back: true,
            });

            let mut result = step.rollback();
            if result.is_success() {
                audit_log.record_rollback(step.id(), AuditStatus::RolledBack);
            } else {
                audit_log.record_rollback(step.id(), AuditStatus::RollbackFailed);
                if let Some(error) = result.take_failure() {
                    rollback_errors.push(RollbackError {
                        step: step.description().to_string(),
                        step_id: step.id(),
                        description: step.rollback_description(),
                        error,
                    });
                }
            }
            rollbacks.push(result);
        }

        (rollbacks, rollback_errors)
    }
}

fn report<F>(progress: &mut F, update: &RunProgress<'_>)
where
    F: FnMut(&RunProgress<'_>) + ?Sized,
{
    notify_contained("progress callback", || progress(update));
}
