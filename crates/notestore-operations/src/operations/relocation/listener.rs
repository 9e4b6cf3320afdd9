use notestore_saga::StateTransition;

use super::result::{TransactionProgress, TransactionResult, TransactionStarted};

/// Receives lifecycle events of every relocation a manager runs.
///
/// Events are fire-and-forget and never influence the transaction.
pub trait TransactionListener: Send + Sync {
    fn on_started(&self, _event: &TransactionStarted) {}

    fn on_progress(&self, _progress: &TransactionProgress) {}

    fn on_step_transition(&self, _transition: &StateTransition) {}

    fn on_completed(&self, _result: &TransactionResult) {}
}

/// Per-call progress receiver.
pub trait ProgressSink {
    fn report(&self, progress: &TransactionProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&TransactionProgress),
{
    fn report(&self, progress: &TransactionProgress) {
        self(progress);
    }
}
