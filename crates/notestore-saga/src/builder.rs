use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::state::StepObserver;
use crate::step::TransactionStep;
use crate::tracked::TrackedStep;
use crate::transaction::Transaction;

/// Marker type for a builder with no steps.
pub struct Empty;

/// Marker type for a builder with at least one step.
pub struct HasSteps;

/// Type-state builder for transactions.
///
/// A transaction cannot be built without at least one step:
///
/// ```compile_fail
/// use notestore_saga::{Transaction, TransactionBuilder};
///
/// // `build()` is only available after `first_step()`
/// let tx: Transaction<std::io::Error> = TransactionBuilder::new().build();
/// ```
pub struct TransactionBuilder<E, State> {
    steps: Vec<TrackedStep<E>>,
    observers: Vec<Arc<dyn StepObserver>>,
    _state: PhantomData<State>,
}

impl<E> TransactionBuilder<E, Empty>
where
    E: Display,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            observers: Vec::new(),
            _state: PhantomData,
        }
    }

    /// Add the first step.
    #[must_use]
    pub fn first_step<S>(self, step: S) -> TransactionBuilder<E, HasSteps>
    where
        S: TransactionStep<Error = E> + 'static,
    {
        let mut steps = self.steps;
        steps.push(TrackedStep::new(step));
        TransactionBuilder {
            steps,
            observers: self.observers,
            _state: PhantomData,
        }
    }
}

impl<E> Default for TransactionBuilder<E, Empty>
where
    E: Display,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, State> TransactionBuilder<E, State>
where
    E: Display,
{
    /// Register an observer that will see state transitions of every step.
    #[must_use]
    pub fn observe(mut self, observer: Arc<dyn StepObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl<E> TransactionBuilder<E, HasSteps>
where
    E: Display,
{
    /// Add another step.
    #[must_use]
    pub fn then<S>(mut self, step: S) -> Self
    where
        S: TransactionStep<Error = E> + 'static,
    {
        self.steps.push(TrackedStep::new(step));
        self
    }

    /// Add a step only when `condition` holds; otherwise the step is not
    /// part of the transaction at all.
    #[must_use]
    pub fn then_if<S>(self, condition: bool, step: impl FnOnce() -> S) -> Self
    where
        S: TransactionStep<Error = E> + 'static,
    {
        if condition { self.then(step()) } else { self }
    }

    #[must_use]
    pub fn build(self) -> Transaction<E> {
        let mut transaction = Transaction::from_steps(self.steps);
        for observer in &self.observers {
            transaction.subscribe(observer);
        }
        transaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::StepData;

    #[derive(Debug, thiserror::Error)]
    #[error("never")]
    struct Never;

    struct Noop(&'static str);

    impl TransactionStep for Noop {
        type Error = Never;

        fn description(&self) -> &str {
            self.0
        }

        fn execute(&mut self) -> Result<StepData, Self::Error> {
            Ok(StepData::Null)
        }
    }

    #[test]
    fn builder_creates_single_step_transaction() {
        let tx = TransactionBuilder::new().first_step(Noop("only")).build();

        assert_eq!(tx.len(), 1);
    }

    #[test]
    fn builder_keeps_step_order() {
        let tx = TransactionBuilder::new()
            .first_step(Noop("a"))
            .then(Noop("b"))
            .then(Noop("c"))
            .build();

        let names: Vec<&str> = tx.steps().iter().map(TrackedStep::description).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn then_if_skips_step_when_condition_is_false() {
        let tx = TransactionBuilder::new()
            .first_step(Noop("a"))
            .then_if(false, || Noop("skipped"))
            .then_if(true, || Noop("kept"))
            .build();

        let names: Vec<&str> = tx.steps().iter().map(TrackedStep::description).collect();
        assert_eq!(names, vec!["a", "kept"]);
    }

    #[test]
    fn observers_registered_on_builder_reach_every_step() {
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let mut tx = TransactionBuilder::new()
            .observe(Arc::new(move |_: &crate::StateTransition| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }))
            .first_step(Noop("a"))
            .then(Noop("b"))
            .build();

        let _ = tx.run(|_| {});

        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 4);
    }
}
