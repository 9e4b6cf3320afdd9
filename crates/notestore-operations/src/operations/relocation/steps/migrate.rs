use std::sync::Arc;

use notestore_saga::{StepData, TransactionStep};
use serde_json::json;
use tracing::{info, warn};

use super::{RelocationPlan, SharedHandoff};
use crate::error::OperationError;
use crate::operations::relocation::RelocationContext;
use crate::traits::MigrationReport;

/// Copies the note data from the old root to the new one.
pub(crate) struct MigrateDataStep {
    ctx: RelocationContext,
    plan: Arc<RelocationPlan>,
    handoff: SharedHandoff,
    report: MigrationReport,
}

impl MigrateDataStep {
    pub fn new(ctx: RelocationContext, plan: Arc<RelocationPlan>, handoff: SharedHandoff) -> Self {
        Self {
            ctx,
            plan,
            handoff,
            report: MigrationReport::default(),
        }
    }
}

impl TransactionStep for MigrateDataStep {
    type Error = OperationError;

    fn description(&self) -> &str {
        "migrate data"
    }

    fn execute(&mut self) -> Result<StepData, Self::Error> {
        let migrator = self.ctx.migrator();
        let mut report = MigrationReport::default();
        if let Err(e) = migrator.copy_tree(&self.plan.old_path, &self.plan.new_path, &mut report) {
            if let Err(undo_err) = migrator.undo(&report) {
                warn!(error = %undo_err, "failed to remove partially copied data");
                return Err(e.with_failed_undo("remove partially copied data", undo_err));
            }
            return Err(e);
        }

        info!(
            from = %self.plan.old_path.display(),
            to = %self.plan.new_path.display(),
            files = report.created_files.len(),
            skipped = report.skipped,
            "migrated data"
        );
        let data = json!({
            "files_copied": report.created_files.len(),
            "directories_created": report.created_dirs.len(),
            "skipped": report.skipped,
        });
        self.report = report;
        self.handoff.lock().data_migrated = true;
        Ok(data)
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        self.ctx.migrator().undo(&self.report)?;
        self.report = MigrationReport::default();
        self.handoff.lock().data_migrated = false;
        Ok(())
    }

    fn rollback_description(&self) -> String {
        format!(
            "remove {} file(s) copied to the new location",
            self.report.created_files.len()
        )
    }
}
