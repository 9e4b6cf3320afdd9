use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use notestore_core::StorageMode;
use notestore_engine::SaveEngine;

mod cleanup;
mod create_engine;
mod finalize;
mod flush;
mod migrate;
mod swap;
mod update_paths;
mod validate;

pub(crate) use cleanup::CleanupStep;
pub(crate) use create_engine::CreateSaveEngineStep;
pub(crate) use finalize::FinalizeStep;
pub(crate) use flush::FlushDirtyDocumentsStep;
pub(crate) use migrate::MigrateDataStep;
pub(crate) use swap::SwapActiveSaveEngineStep;
pub(crate) use update_paths::UpdateDependentPathsStep;
pub(crate) use validate::ValidationStep;
pub use validate::validate_location;

/// Fixed inputs of one relocation.
#[derive(Debug, Clone)]
pub(crate) struct RelocationPlan {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub mode: StorageMode,
    pub keep_original_data: bool,
    pub same_location: bool,
}

/// State handed from one step to a later one.
#[derive(Default)]
pub(crate) struct Handoff {
    /// Engine built by `CreateSaveEngineStep`, activated by the swap.
    pub new_engine: Option<Arc<dyn SaveEngine>>,
    /// Engine that was active before the swap.
    pub previous_engine: Option<Arc<dyn SaveEngine>>,
    pub data_migrated: bool,
}

#[derive(Clone, Default)]
pub(crate) struct SharedHandoff(Arc<Mutex<Handoff>>);

impl SharedHandoff {
    pub fn lock(&self) -> MutexGuard<'_, Handoff> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn data_migrated(&self) -> bool {
        self.lock().data_migrated
    }
}
