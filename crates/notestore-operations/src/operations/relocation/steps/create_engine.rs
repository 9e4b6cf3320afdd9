use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use notestore_engine::SaveEngine;
use notestore_saga::{StepData, TransactionStep};
use serde_json::json;
use tracing::{debug, warn};

use super::{RelocationPlan, SharedHandoff};
use crate::config::metadata_path_for;
use crate::error::OperationError;
use crate::operations::relocation::RelocationContext;

pub(crate) struct CreateSaveEngineStep {
    ctx: RelocationContext,
    plan: Arc<RelocationPlan>,
    handoff: SharedHandoff,
    created_dirs: Vec<PathBuf>,
}

impl CreateSaveEngineStep {
    pub fn new(ctx: RelocationContext, plan: Arc<RelocationPlan>, handoff: SharedHandoff) -> Self {
        Self {
            ctx,
            plan,
            handoff,
            created_dirs: Vec::new(),
        }
    }

    fn create_directories(&mut self) -> Result<(), OperationError> {
        let root = &self.plan.new_path;
        let mut missing: Vec<PathBuf> = root
            .ancestors()
            .take_while(|p| !p.exists())
            .map(PathBuf::from)
            .collect();
        missing.reverse();

        let metadata = metadata_path_for(root);
        if !metadata.exists() {
            missing.push(metadata);
        }

        for dir in missing {
            fs::create_dir(&dir).map_err(|source| OperationError::CreateDirectory {
                path: dir.clone(),
                source,
            })?;
            debug!(path = %dir.display(), "created directory");
            self.created_dirs.push(dir);
        }
        Ok(())
    }

    fn build_engine(&self) -> Result<Arc<dyn SaveEngine>, OperationError> {
        let engine = self.ctx.factory().create(&self.plan.new_path)?;
        if engine.is_disposed() || engine.data_root() != self.plan.new_path {
            engine.dispose();
            return Err(OperationError::EngineNotUsable(self.plan.new_path.clone()));
        }
        let dirty = engine.dirty_document_ids();
        debug!(
            root = %engine.data_root().display(),
            dirty = dirty.len(),
            "new save engine responds"
        );
        Ok(engine)
    }

    fn remove_created_directories(&mut self) {
        for dir in self.created_dirs.drain(..).rev() {
            if let Err(e) = fs::remove_dir(&dir) {
                warn!(path = %dir.display(), error = %e, "left created directory in place");
            }
        }
    }
}

impl TransactionStep for CreateSaveEngineStep {
    type Error = OperationError;

    fn description(&self) -> &str {
        "create save engine"
    }

    fn execute(&mut self) -> Result<StepData, Self::Error> {
        if let Err(e) = self.create_directories() {
            self.remove_created_directories();
            return Err(e);
        }
        let engine = match self.build_engine() {
            Ok(engine) => engine,
            Err(e) => {
                self.remove_created_directories();
                return Err(e);
            }
        };

        let data = json!({
            "engine_root": engine.data_root(),
            "created_directories": self.created_dirs.len(),
        });
        self.handoff.lock().new_engine = Some(engine);
        Ok(data)
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        if let Some(engine) = self.handoff.lock().new_engine.take() {
            engine.dispose();
            debug!(root = %engine.data_root().display(), "disposed new save engine");
        }
        self.remove_created_directories();
        Ok(())
    }

    fn rollback_description(&self) -> String {
        "dispose the new save engine and remove directories created for it".to_string()
    }
}
