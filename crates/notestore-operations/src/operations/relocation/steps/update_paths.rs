use std::path::PathBuf;
use std::sync::Arc;

use notestore_core::StorageMode;
use notestore_saga::{StepData, TransactionStep};
use serde_json::json;
use tracing::{debug, info, warn};

use super::RelocationPlan;
use crate::Result;
use crate::config::metadata_path_for;
use crate::error::OperationError;
use crate::operations::relocation::RelocationContext;

#[derive(Debug, Clone)]
struct CapturedPaths {
    root_path: Option<PathBuf>,
    default_path: Option<PathBuf>,
    metadata_path: Option<PathBuf>,
    mode: StorageMode,
    watched: Option<PathBuf>,
}

/// Points the root-path registry, the configuration and the file watcher at
/// the new location.
pub(crate) struct UpdateDependentPathsStep {
    ctx: RelocationContext,
    plan: Arc<RelocationPlan>,
    captured: Option<CapturedPaths>,
}

impl UpdateDependentPathsStep {
    pub fn new(ctx: RelocationContext, plan: Arc<RelocationPlan>) -> Self {
        Self {
            ctx,
            plan,
            captured: None,
        }
    }

    fn capture(&self) -> CapturedPaths {
        let configuration = self.ctx.configuration();
        CapturedPaths {
            root_path: self.ctx.root_path().root_path(),
            default_path: configuration.default_path(),
            metadata_path: configuration.metadata_path(),
            mode: configuration.storage_mode(),
            watched: self.ctx.watcher().watched_directory(),
        }
    }

    fn apply(&self) -> Result<()> {
        let new_path = &self.plan.new_path;
        self.ctx.root_path().set_root_path(new_path);

        let configuration = self.ctx.configuration();
        configuration.set_default_path(Some(new_path));
        configuration.set_metadata_path(Some(&metadata_path_for(new_path)));
        configuration.set_storage_mode(self.plan.mode);
        configuration.persist()?;

        let watcher = self.ctx.watcher();
        let options = self.ctx.options();
        watcher.stop_all();
        watcher.start_watching(new_path, &options.watch_filter, options.watch_recursive)
    }

    fn restore(&mut self) -> Result<()> {
        let Some(captured) = self.captured.take() else {
            return Ok(());
        };

        let registry = self.ctx.root_path();
        match &captured.root_path {
            Some(root) => registry.set_root_path(root),
            None => registry.clear_root_path(),
        }

        let configuration = self.ctx.configuration();
        configuration.set_default_path(captured.default_path.as_deref());
        configuration.set_metadata_path(captured.metadata_path.as_deref());
        configuration.set_storage_mode(captured.mode);
        let persisted = configuration.persist();

        let watcher = self.ctx.watcher();
        let options = self.ctx.options();
        watcher.stop_all();
        let watching = match &captured.watched {
            Some(dir) => {
                watcher.start_watching(dir, &options.watch_filter, options.watch_recursive)
            }
            None => Ok(()),
        };

        debug!(root = ?captured.root_path, "restored dependent paths");
        persisted.and(watching)
    }
}

impl TransactionStep for UpdateDependentPathsStep {
    type Error = OperationError;

    fn description(&self) -> &str {
        "update dependent paths"
    }

    fn execute(&mut self) -> Result<StepData> {
        self.captured = Some(self.capture());

        if let Err(e) = self.apply() {
            // Undo the partial update here; a failed step is not rolled back.
            if let Err(restore_err) = self.restore() {
                warn!(error = %restore_err, "failed to restore dependent paths");
                return Err(e.with_failed_undo(self.rollback_description(), restore_err));
            }
            return Err(e);
        }

        let new_path = &self.plan.new_path;
        info!(root = %new_path.display(), mode = %self.plan.mode, "updated dependent paths");
        Ok(json!({
            "root_path": new_path,
            "metadata_path": metadata_path_for(new_path),
            "mode": self.plan.mode.to_string(),
            "watching": new_path,
        }))
    }

    fn rollback(&mut self) -> Result<()> {
        self.restore()
    }

    fn rollback_description(&self) -> String {
        "restore the previous root path, configuration and watched directory".to_string()
    }
}
