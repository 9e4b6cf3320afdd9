//! Storage relocation for notestore.
//!
//! [`StorageTransactionManager`](operations::StorageTransactionManager) moves
//! the storage root as one transaction of reversible steps; the collaborators
//! it drives are defined in [`traits`] with file-system implementations in
//! [`providers`].

pub mod config;
mod error;
pub mod operations;
pub mod providers;
pub mod traits;

#[cfg(test)]
pub mod mocks;

pub use error::{OperationError, Result, RollbackFailure};
