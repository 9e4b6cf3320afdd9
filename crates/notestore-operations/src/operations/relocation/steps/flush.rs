use notestore_saga::{StepData, TransactionStep};
use serde_json::json;
use tracing::{debug, info};

use crate::error::OperationError;
use crate::operations::relocation::RelocationContext;

/// Saves every dirty document of the active engine before it is swapped out.
///
/// Documents are saved at the current location, which stays authoritative if
/// the relocation is rolled back, so there is nothing to undo.
pub(crate) struct FlushDirtyDocumentsStep {
    ctx: RelocationContext,
}

impl FlushDirtyDocumentsStep {
    pub fn new(ctx: RelocationContext) -> Self {
        Self { ctx }
    }
}

impl TransactionStep for FlushDirtyDocumentsStep {
    type Error = OperationError;

    fn description(&self) -> &str {
        "flush dirty documents"
    }

    fn execute(&mut self) -> Result<StepData, Self::Error> {
        let engine = self.ctx.factory().current();
        let dirty = engine.dirty_document_ids();
        debug!(
            root = %engine.data_root().display(),
            dirty = dirty.len(),
            "flushing dirty documents"
        );

        let report = engine.save_all_dirty();
        if !report.is_complete() {
            return Err(OperationError::FlushFailed {
                failed: report.failed_ids,
            });
        }
        info!(saved = report.saved, "flushed dirty documents");
        Ok(json!({ "saved": report.saved, "failed": report.failed }))
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        debug!("saved documents stay at the original location");
        Ok(())
    }

    fn rollback_description(&self) -> String {
        "keep saved documents at the original location".to_string()
    }
}
