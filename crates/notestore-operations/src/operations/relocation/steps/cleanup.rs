use std::sync::Arc;

use notestore_saga::{StepData, TransactionStep};
use serde_json::json;
use tracing::{debug, info, warn};

use super::{RelocationPlan, SharedHandoff};
use crate::error::OperationError;
use crate::operations::relocation::RelocationContext;

/// Retires the previous save engine and, when asked to, removes the data at
/// the old location.
///
/// Runs last and never fails: a removal error is logged and reported in the
/// step data.
pub(crate) struct CleanupStep {
    ctx: RelocationContext,
    plan: Arc<RelocationPlan>,
    handoff: SharedHandoff,
}

impl CleanupStep {
    pub fn new(ctx: RelocationContext, plan: Arc<RelocationPlan>, handoff: SharedHandoff) -> Self {
        Self { ctx, plan, handoff }
    }
}

impl TransactionStep for CleanupStep {
    type Error = OperationError;

    fn description(&self) -> &str {
        "clean up original location"
    }

    fn can_rollback(&self) -> bool {
        false
    }

    fn execute(&mut self) -> Result<StepData, Self::Error> {
        let (previous, migrated) = {
            let mut handoff = self.handoff.lock();
            (handoff.previous_engine.take(), handoff.data_migrated)
        };
        if let Some(engine) = previous {
            engine.dispose();
            debug!(root = %engine.data_root().display(), "disposed previous save engine");
        }

        let remove = !self.plan.keep_original_data && migrated;
        let mut removed = false;
        let mut error = None;
        if remove {
            match self.ctx.migrator().remove_tree(&self.plan.old_path) {
                Ok(()) => {
                    info!(path = %self.plan.old_path.display(), "removed original data");
                    removed = true;
                }
                Err(e) => {
                    warn!(
                        path = %self.plan.old_path.display(),
                        error = %e,
                        "failed to remove original data"
                    );
                    error = Some(e.to_string());
                }
            }
        }

        Ok(json!({
            "original_removed": removed,
            "removal_error": error,
        }))
    }
}
