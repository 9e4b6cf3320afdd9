//! Reversible multi-step transactions.
//!
//! A transaction is an ordered list of steps. Each step runs inside a
//! tracking wrapper that owns its lifecycle state, measures its duration and
//! turns errors and panics into failed results. When a step fails, every
//! previously completed step that supports rollback is undone in reverse
//! completion order.

mod audit;
mod builder;
mod error;
mod notify;
mod result;
mod state;
mod step;
mod tracked;
mod transaction;

pub use audit::{AuditRecord, AuditStatus, TransactionAuditLog};
pub use builder::TransactionBuilder;
pub use error::{RollbackError, StepFailure, TransactionError};
pub use notify::notify_contained;
pub use result::{StepData, StepResult};
pub use state::{StateTransition, StepId, StepObserver, StepState};
pub use step::TransactionStep;
pub use tracked::TrackedStep;
pub use transaction::{RunProgress, Transaction, TransactionRun};
