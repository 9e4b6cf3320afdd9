use std::sync::Arc;

use notestore_engine::SaveEngineState;
use notestore_saga::{StepData, TransactionStep};
use serde_json::json;
use tracing::{debug, warn};

use super::{RelocationPlan, SharedHandoff};
use crate::error::OperationError;
use crate::operations::relocation::RelocationContext;

pub(crate) struct SwapActiveSaveEngineStep {
    ctx: RelocationContext,
    plan: Arc<RelocationPlan>,
    handoff: SharedHandoff,
    captured: Option<SaveEngineState>,
}

impl SwapActiveSaveEngineStep {
    pub fn new(ctx: RelocationContext, plan: Arc<RelocationPlan>, handoff: SharedHandoff) -> Self {
        Self {
            ctx,
            plan,
            handoff,
            captured: None,
        }
    }

    fn restore(&mut self) -> Result<(), OperationError> {
        let Some(state) = self.captured.take() else {
            return Ok(());
        };
        self.ctx.factory().restore_state(&state)?;
        self.handoff.lock().previous_engine = None;
        debug!(root = %state.data_root().display(), "restored previous save engine");
        Ok(())
    }
}

impl TransactionStep for SwapActiveSaveEngineStep {
    type Error = OperationError;

    fn description(&self) -> &str {
        "swap active save engine"
    }

    fn execute(&mut self) -> Result<StepData, Self::Error> {
        let engine = self
            .handoff
            .lock()
            .new_engine
            .clone()
            .ok_or(OperationError::EngineNotPrepared)?;

        let state = self.ctx.factory().capture_state();
        let documents = state.document_count();
        let previous_root = state.data_root().to_path_buf();
        self.captured = Some(state);

        let previous = self.ctx.factory().replace(Arc::clone(&engine));
        self.handoff.lock().previous_engine = Some(previous);

        let current = self.ctx.factory().current();
        if !Arc::ptr_eq(&current, &engine) || current.data_root() != self.plan.new_path {
            let err = OperationError::SwapNotVisible {
                expected: self.plan.new_path.clone(),
                actual: current.data_root().to_path_buf(),
            };
            if let Err(restore_err) = self.restore() {
                warn!(error = %restore_err, "failed to restore save engine after bad swap");
                return Err(err.with_failed_undo(self.rollback_description(), restore_err));
            }
            return Err(err);
        }
        let dirty = current.dirty_document_ids();
        debug!(dirty = dirty.len(), "active save engine responds after swap");

        Ok(json!({
            "previous_root": previous_root,
            "active_root": self.plan.new_path,
            "documents_captured": documents,
        }))
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        self.restore()
    }

    fn rollback_description(&self) -> String {
        "reactivate the previous save engine with its captured documents".to_string()
    }
}
