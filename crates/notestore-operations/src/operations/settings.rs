use std::path::PathBuf;
use std::sync::Arc;

use notestore_core::StorageMode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::relocation::{ProgressSink, StorageTransactionManager, TransactionResult};
use crate::Result;
use crate::traits::ConfigurationStore;

/// User-facing storage settings, as edited in a preferences dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    pub storage_path: PathBuf,
    pub mode: StorageMode,
    pub autosave_interval_secs: u64,
}

impl StorageSettings {
    /// Settings as currently stored, with `storage_path` as the fallback
    /// when no default path is configured.
    #[must_use]
    pub fn load(configuration: &dyn ConfigurationStore, storage_path: PathBuf) -> Self {
        Self {
            storage_path: configuration.default_path().unwrap_or(storage_path),
            mode: configuration.storage_mode(),
            autosave_interval_secs: configuration.autosave_interval_secs(),
        }
    }

    fn same_location(&self, other: &Self) -> bool {
        self.storage_path == other.storage_path && self.mode == other.mode
    }
}

#[derive(Debug)]
pub enum ApplyOutcome {
    /// Nothing differed.
    Unchanged,
    /// Only plain settings changed and were written.
    SettingsWritten,
    /// The location or mode changed and a relocation ran.
    Relocated {
        result: TransactionResult,
        /// Settings now in effect: the proposed ones on success, the
        /// previous location and mode on failure.
        settings: StorageSettings,
    },
}

/// Decides whether applying settings needs a relocation.
pub struct SettingsCoordinator {
    manager: Arc<StorageTransactionManager>,
}

impl SettingsCoordinator {
    #[must_use]
    pub fn new(manager: Arc<StorageTransactionManager>) -> Self {
        Self { manager }
    }

    /// Apply `proposed` on top of `current`.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing plain settings fails. A failed
    /// relocation is reported through [`ApplyOutcome::Relocated`].
    pub fn apply(
        &self,
        current: &StorageSettings,
        proposed: &StorageSettings,
        keep_original_data: bool,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<ApplyOutcome> {
        let plain_changed = current.autosave_interval_secs != proposed.autosave_interval_secs;

        if current.same_location(proposed) {
            if !plain_changed {
                debug!("storage settings unchanged");
                return Ok(ApplyOutcome::Unchanged);
            }
            self.write_plain(proposed)?;
            return Ok(ApplyOutcome::SettingsWritten);
        }

        let result = self.manager.change_storage_location(
            &proposed.storage_path,
            proposed.mode,
            keep_original_data,
            progress,
        );

        if !result.success {
            warn!(
                path = %proposed.storage_path.display(),
                error = result.error_message.as_deref().unwrap_or_default(),
                "storage relocation failed, keeping previous settings"
            );
            let settings = StorageSettings {
                storage_path: result.old_path.clone(),
                mode: current.mode,
                autosave_interval_secs: current.autosave_interval_secs,
            };
            return Ok(ApplyOutcome::Relocated { result, settings });
        }

        if plain_changed {
            self.write_plain(proposed)?;
        }
        info!(path = %proposed.storage_path.display(), "applied storage settings");
        Ok(ApplyOutcome::Relocated {
            result,
            settings: proposed.clone(),
        })
    }

    fn write_plain(&self, settings: &StorageSettings) -> Result<()> {
        let configuration = self.manager.context().configuration();
        configuration.set_autosave_interval_secs(settings.autosave_interval_secs);
        configuration.persist()
    }
}
