use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::StepFailure;
use crate::notify::{notify_contained, panic_message};
use crate::result::{StepData, StepResult};
use crate::state::{StateTransition, StepId, StepObserver, StepState};
use crate::step::TransactionStep;

/// Runs a [`TransactionStep`] under the step state machine.
///
/// The wrapper enforces the execute/rollback preconditions, times each call,
/// notifies observers on every state transition and converts errors and
/// panics from the step into failed results. Neither `execute` nor
/// `rollback` ever panics or returns an error.
pub struct TrackedStep<E> {
    id: StepId,
    state: StepState,
    description: String,
    step: Box<dyn TransactionStep<Error = E>>,
    observers: Vec<Arc<dyn StepObserver>>,
}

impl<E> TrackedStep<E>
where
    E: Display,
{
    pub fn new<S>(step: S) -> Self
    where
        S: TransactionStep<Error = E> + 'static,
    {
        Self {
            id: StepId::new(),
            state: StepState::NotStarted,
            description: step.description().to_string(),
            step: Box::new(step),
            observers: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> StepId {
        self.id
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn state(&self) -> StepState {
        self.state
    }

    #[must_use]
    pub fn can_rollback(&self) -> bool {
        self.step.can_rollback()
    }

    #[must_use]
    pub fn rollback_description(&self) -> String {
        self.step.rollback_description()
    }

    pub fn subscribe(&mut self, observer: Arc<dyn StepObserver>) {
        self.observers.push(observer);
    }

    /// Execute the step. Only valid from [`StepState::NotStarted`].
    pub fn execute(&mut self) -> StepResult<E> {
        if !self.state.can_execute() {
            return StepResult::failed(
                self.id,
                &self.description,
                std::time::Duration::ZERO,
                StepFailure::InvalidState {
                    action: "execute",
                    state: self.state,
                },
            );
        }

        self.transition(StepState::Executing);
        debug!(step = %self.description, id = %self.id, "executing step");

        let started = Instant::now();
        let step = &mut self.step;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| step.execute()));
        let elapsed = started.elapsed();

        match flatten(outcome) {
            Ok(data) => {
                self.transition(StepState::Completed);
                debug!(
                    step = %self.description,
                    elapsed_ms = elapsed.as_millis(),
                    "step completed"
                );
                StepResult::succeeded(self.id, &self.description, elapsed, data)
            }
            Err(failure) => {
                self.transition(StepState::Failed);
                warn!(
                    step = %self.description,
                    elapsed_ms = elapsed.as_millis(),
                    error = %failure,
                    "step failed"
                );
                StepResult::failed(self.id, &self.description, elapsed, failure)
            }
        }
    }

    /// Undo the step. Only valid when the step supports rollback and is
    /// [`StepState::Completed`] or [`StepState::Failed`].
    pub fn rollback(&mut self) -> StepResult<E> {
        if !self.step.can_rollback() {
            return StepResult::failed(
                self.id,
                &self.description,
                std::time::Duration::ZERO,
                StepFailure::RollbackUnsupported,
            );
        }
        if !self.state.can_roll_back() {
            return StepResult::failed(
                self.id,
                &self.description,
                std::time::Duration::ZERO,
                StepFailure::InvalidState {
                    action: "roll back",
                    state: self.state,
                },
            );
        }

        self.transition(StepState::RollingBack);
        debug!(
            step = %self.description,
            rollback = %self.step.rollback_description(),
            "rolling back step"
        );

        let started = Instant::now();
        let step = &mut self.step;
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| step.rollback().map(|()| StepData::Null)));
        let elapsed = started.elapsed();

        match flatten(outcome) {
            Ok(data) => {
                self.transition(StepState::RolledBack);
                StepResult::succeeded(self.id, &self.description, elapsed, data)
            }
            Err(failure) => {
                self.transition(StepState::RollbackFailed);
                warn!(
                    step = %self.description,
                    error = %failure,
                    "step rollback failed"
                );
                StepResult::failed(self.id, &self.description, elapsed, failure)
            }
        }
    }

    fn transition(&mut self, to: StepState) {
        let from = self.state;
        self.state = to;
        if self.observers.is_empty() {
            return;
        }
        let transition = StateTransition {
            step_id: self.id,
            description: self.description.clone(),
            from,
            to,
            at: Utc::now(),
        };
        for observer in &self.observers {
            notify_contained("step observer", || observer.on_transition(&transition));
        }
    }
}

fn flatten<T, E>(
    outcome: std::thread::Result<Result<T, E>>,
) -> Result<T, StepFailure<E>> {
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(StepFailure::Step(error)),
        Err(payload) => Err(StepFailure::Panicked(panic_message(payload.as_ref()))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("{0}")]
    struct TestError(String);

    struct Scripted {
        fail_execute: bool,
        fail_rollback: bool,
        panic_execute: bool,
        reversible: bool,
    }

    impl Scripted {
        fn ok() -> Self {
            Self {
                fail_execute: false,
                fail_rollback: false,
                panic_execute: false,
                reversible: true,
            }
        }
    }

    impl TransactionStep for Scripted {
        type Error = TestError;

        fn description(&self) -> &str {
            "scripted"
        }

        fn can_rollback(&self) -> bool {
            self.reversible
        }

        fn execute(&mut self) -> Result<StepData, Self::Error> {
            assert!(!self.panic_execute, "scripted step exploded");
            if self.fail_execute {
                return Err(TestError("execute failed".to_string()));
            }
            Ok(serde_json::json!({ "ran": true }))
        }

        fn rollback(&mut self) -> Result<(), Self::Error> {
            if self.fail_rollback {
                return Err(TestError("rollback failed".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn new_step_is_not_started() {
        let step = TrackedStep::new(Scripted::ok());

        assert_eq!(step.state(), StepState::NotStarted);
        assert_eq!(step.description(), "scripted");
    }

    #[test]
    fn successful_execute_completes_with_data() {
        let mut step = TrackedStep::new(Scripted::ok());

        let result = step.execute();

        assert!(result.is_success());
        assert_eq!(result.data()["ran"], true);
        assert_eq!(step.state(), StepState::Completed);
    }

    #[test]
    fn failing_execute_is_converted_to_failed_result() {
        let mut step = TrackedStep::new(Scripted {
            fail_execute: true,
            ..Scripted::ok()
        });

        let result = step.execute();

        assert!(!result.is_success());
        assert_eq!(result.error_message(), Some("execute failed"));
        assert_eq!(step.state(), StepState::Failed);
    }

    #[test]
    fn panicking_execute_is_contained() {
        let mut step = TrackedStep::new(Scripted {
            panic_execute: true,
            ..Scripted::ok()
        });

        let result = step.execute();

        assert!(matches!(result.failure(), Some(StepFailure::Panicked(msg)) if msg.contains("scripted step exploded")));
        assert_eq!(step.state(), StepState::Failed);
    }

    #[test]
    fn execute_twice_is_rejected() {
        let mut step = TrackedStep::new(Scripted::ok());
        let _ = step.execute();

        let second = step.execute();

        assert!(matches!(
            second.failure(),
            Some(StepFailure::InvalidState {
                action: "execute",
                state: StepState::Completed
            })
        ));
        assert_eq!(step.state(), StepState::Completed);
    }

    #[test]
    fn rollback_before_execute_is_rejected() {
        let mut step = TrackedStep::new(Scripted::ok());

        let result = step.rollback();

        assert!(!result.is_success());
        assert_eq!(step.state(), StepState::NotStarted);
    }

    #[test]
    fn rollback_of_irreversible_step_fails_without_side_effects() {
        let mut step = TrackedStep::new(Scripted {
            reversible: false,
            ..Scripted::ok()
        });
        let _ = step.execute();

        let result = step.rollback();

        assert!(matches!(
            result.failure(),
            Some(StepFailure::RollbackUnsupported)
        ));
        assert_eq!(step.state(), StepState::Completed);
    }

    #[test]
    fn successful_rollback_ends_rolled_back() {
        let mut step = TrackedStep::new(Scripted::ok());
        let _ = step.execute();

        let result = step.rollback();

        assert!(result.is_success());
        assert_eq!(step.state(), StepState::RolledBack);
    }

    #[test]
    fn failed_step_can_be_rolled_back() {
        let mut step = TrackedStep::new(Scripted {
            fail_execute: true,
            ..Scripted::ok()
        });
        let _ = step.execute();

        let result = step.rollback();

        assert!(result.is_success());
        assert_eq!(step.state(), StepState::RolledBack);
    }

    #[test]
    fn failing_rollback_ends_rollback_failed() {
        let mut step = TrackedStep::new(Scripted {
            fail_rollback: true,
            ..Scripted::ok()
        });
        let _ = step.execute();

        let result = step.rollback();

        assert_eq!(result.error_message(), Some("rollback failed"));
        assert_eq!(step.state(), StepState::RollbackFailed);
    }

    #[test]
    fn observers_see_every_transition() {
        let seen: Arc<Mutex<Vec<(StepState, StepState)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut step = TrackedStep::new(Scripted::ok());
        step.subscribe(Arc::new(move |t: &StateTransition| {
            sink.lock().expect("lock").push((t.from, t.to));
        }));

        let _ = step.execute();
        let _ = step.rollback();

        assert_eq!(
            *seen.lock().expect("lock"),
            vec![
                (StepState::NotStarted, StepState::Executing),
                (StepState::Executing, StepState::Completed),
                (StepState::Completed, StepState::RollingBack),
                (StepState::RollingBack, StepState::RolledBack),
            ]
        );
    }

    #[test]
    fn panicking_observer_does_not_interrupt_the_step() {
        let seen: Arc<Mutex<Vec<StepState>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut step = TrackedStep::new(Scripted::ok());
        step.subscribe(Arc::new(|_: &StateTransition| panic!("observer exploded")));
        step.subscribe(Arc::new(move |t: &StateTransition| {
            sink.lock().expect("lock").push(t.to);
        }));

        let result = step.execute();

        assert!(result.is_success());
        assert_eq!(step.state(), StepState::Completed);
        assert_eq!(
            *seen.lock().expect("lock"),
            vec![StepState::Executing, StepState::Completed]
        );
    }
}
