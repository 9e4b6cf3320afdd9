pub mod relocation;
pub mod settings;

pub use relocation::{
    ProgressSink, RelocationContext, RollbackSummary, StepSummary, StorageTransactionManager,
    TransactionId, TransactionListener, TransactionProgress, TransactionResult,
    TransactionStarted, validate_location,
};
pub use settings::{ApplyOutcome, SettingsCoordinator, StorageSettings};
