use std::path::Path;
use std::sync::Arc;

use notestore_saga::{StepData, TransactionStep};
use serde_json::json;

use super::RelocationPlan;
use crate::error::OperationError;
use crate::operations::relocation::RelocationContext;

/// Confirms every component agrees on the new location.
pub(crate) struct FinalizeStep {
    ctx: RelocationContext,
    plan: Arc<RelocationPlan>,
}

impl FinalizeStep {
    pub fn new(ctx: RelocationContext, plan: Arc<RelocationPlan>) -> Self {
        Self { ctx, plan }
    }

    fn check(&self, component: &'static str, actual: Option<&Path>) -> Result<(), OperationError> {
        let expected = &self.plan.new_path;
        if actual == Some(expected.as_path()) {
            return Ok(());
        }
        Err(OperationError::Inconsistent {
            component,
            expected: expected.clone(),
            actual: actual.map_or_else(|| "nothing".to_string(), |p| p.display().to_string()),
        })
    }
}

impl TransactionStep for FinalizeStep {
    type Error = OperationError;

    fn description(&self) -> &str {
        "finalize relocation"
    }

    fn can_rollback(&self) -> bool {
        false
    }

    fn execute(&mut self) -> Result<StepData, Self::Error> {
        let engine = self.ctx.factory().current();
        self.check("active save engine", Some(engine.data_root()))?;
        self.check("root path", self.ctx.root_path().root_path().as_deref())?;
        self.check(
            "configured default path",
            self.ctx.configuration().default_path().as_deref(),
        )?;
        self.check(
            "file watcher",
            self.ctx.watcher().watched_directory().as_deref(),
        )?;
        Ok(json!({ "verified": self.plan.new_path }))
    }
}
