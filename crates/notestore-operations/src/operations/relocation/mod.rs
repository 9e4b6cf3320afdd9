mod context;
mod listener;
mod manager;
mod result;
pub(crate) mod steps;

pub use context::RelocationContext;
pub use listener::{ProgressSink, TransactionListener};
pub use manager::StorageTransactionManager;
pub use result::{
    RollbackSummary, StepSummary, TransactionId, TransactionProgress, TransactionResult,
    TransactionStarted,
};
pub use steps::validate_location;
