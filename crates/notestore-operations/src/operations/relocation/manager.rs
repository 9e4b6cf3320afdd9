use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use chrono::Utc;
use indexmap::IndexMap;
use notestore_core::{StorageMode, is_same_location};
use notestore_saga::{
    StateTransition, StepId, Transaction, TransactionBuilder, TransactionRun, notify_contained,
};
use tracing::{error, info, warn};

use super::context::RelocationContext;
use super::listener::{ProgressSink, TransactionListener};
use super::result::{
    RollbackSummary, StepSummary, TransactionId, TransactionProgress, TransactionResult,
    TransactionStarted,
};
use super::steps::{
    CleanupStep, CreateSaveEngineStep, FinalizeStep, FlushDirtyDocumentsStep, MigrateDataStep,
    RelocationPlan, SharedHandoff, SwapActiveSaveEngineStep, UpdateDependentPathsStep,
    ValidationStep,
};
use crate::error::OperationError;

type Listeners = Arc<[Arc<dyn TransactionListener>]>;

/// Moves the storage root as one all-or-nothing transaction.
///
/// Relocations are serialized: a second call waits for the running one and
/// then starts from the location it left behind.
pub struct StorageTransactionManager {
    context: RelocationContext,
    listeners: RwLock<Vec<Arc<dyn TransactionListener>>>,
    gate: Mutex<()>,
}

impl StorageTransactionManager {
    #[must_use]
    pub fn new(context: RelocationContext) -> Self {
        Self {
            context,
            listeners: RwLock::new(Vec::new()),
            gate: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn context(&self) -> &RelocationContext {
        &self.context
    }

    pub fn subscribe(&self, listener: Arc<dyn TransactionListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// The storage root currently in effect.
    #[must_use]
    pub fn current_path(&self) -> PathBuf {
        self.context
            .root_path()
            .root_path()
            .unwrap_or_else(|| self.context.factory().current().data_root().to_path_buf())
    }

    /// Relocate the storage root to `new_path`.
    ///
    /// Never returns an error: failures, including failed rollbacks, are
    /// described by the returned [`TransactionResult`].
    pub fn change_storage_location(
        &self,
        new_path: &Path,
        mode: StorageMode,
        keep_original_data: bool,
        progress: Option<&dyn ProgressSink>,
    ) -> TransactionResult {
        if new_path.as_os_str().is_empty() {
            warn!("rejected storage relocation to an empty path");
            return TransactionResult::rejected(
                PathBuf::new(),
                self.current_path(),
                mode,
                OperationError::EmptyPath,
            );
        }

        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let old_path = self.current_path();
        let plan = Arc::new(RelocationPlan {
            same_location: is_same_location(&old_path, new_path),
            old_path,
            new_path: new_path.to_path_buf(),
            mode,
            keep_original_data,
        });
        self.run(&plan, progress)
    }

    fn listeners(&self) -> Listeners {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn build_transaction(
        &self,
        plan: &Arc<RelocationPlan>,
        handoff: &SharedHandoff,
        listeners: &Listeners,
    ) -> Transaction<OperationError> {
        let ctx = &self.context;
        let observers = Arc::clone(listeners);
        TransactionBuilder::new()
            .observe(Arc::new(move |transition: &StateTransition| {
                for listener in observers.iter() {
                    notify_contained("transaction listener", || {
                        listener.on_step_transition(transition);
                    });
                }
            }))
            .first_step(ValidationStep::new(ctx.clone(), Arc::clone(plan)))
            .then(CreateSaveEngineStep::new(
                ctx.clone(),
                Arc::clone(plan),
                handoff.clone(),
            ))
            .then(FlushDirtyDocumentsStep::new(ctx.clone()))
            .then(SwapActiveSaveEngineStep::new(
                ctx.clone(),
                Arc::clone(plan),
                handoff.clone(),
            ))
            .then(UpdateDependentPathsStep::new(ctx.clone(), Arc::clone(plan)))
            .then_if(!plan.same_location, || {
                MigrateDataStep::new(ctx.clone(), Arc::clone(plan), handoff.clone())
            })
            .then(FinalizeStep::new(ctx.clone(), Arc::clone(plan)))
            .then(CleanupStep::new(ctx.clone(), Arc::clone(plan), handoff.clone()))
            .build()
    }

    fn run(
        &self,
        plan: &Arc<RelocationPlan>,
        progress: Option<&dyn ProgressSink>,
    ) -> TransactionResult {
        let started = Instant::now();
        let transaction_id = TransactionId::new();
        let listeners = self.listeners();
        let handoff = SharedHandoff::default();
        let mut transaction = self.build_transaction(plan, &handoff, &listeners);
        let total_steps = transaction.len();

        info!(
            %transaction_id,
            old = %plan.old_path.display(),
            new = %plan.new_path.display(),
            mode = %plan.mode,
            steps = total_steps,
            "starting storage relocation"
        );
        let event = TransactionStarted {
            transaction_id,
            old_path: plan.old_path.clone(),
            new_path: plan.new_path.clone(),
            mode: plan.mode,
            total_steps,
            started_at: Utc::now(),
        };
        for listener in listeners.iter() {
            notify_contained("transaction listener", || listener.on_started(&event));
        }

        let run = transaction.run(|p| {
            let update =
                TransactionProgress::new(p.completed, p.total, p.operation, p.rolling_back);
            if let Some(sink) = progress {
                notify_contained("progress sink", || sink.report(&update));
            }
            for listener in listeners.iter() {
                notify_contained("transaction listener", || listener.on_progress(&update));
            }
        });

        let result = Self::assemble(transaction_id, plan, &transaction, run, &handoff, started);
        for listener in listeners.iter() {
            notify_contained("transaction listener", || listener.on_completed(&result));
        }
        result
    }

    fn assemble(
        transaction_id: TransactionId,
        plan: &RelocationPlan,
        transaction: &Transaction<OperationError>,
        run: TransactionRun<OperationError>,
        handoff: &SharedHandoff,
        started: Instant,
    ) -> TransactionResult {
        let step_results: IndexMap<StepId, StepSummary> = run
            .results
            .iter()
            .zip(transaction.steps())
            .map(|(result, step)| {
                (
                    result.step_id(),
                    StepSummary {
                        description: result.description().to_string(),
                        success: result.is_success(),
                        error_message: result.error_message().map(str::to_string),
                        duration: result.duration(),
                        data: result.data().clone(),
                        final_state: step.state(),
                    },
                )
            })
            .collect();
        let audit_summary = run.audit_log.summary();
        let duration = started.elapsed();

        let mut result = TransactionResult {
            success: true,
            error_message: None,
            error: None,
            transaction_id: Some(transaction_id),
            new_path: plan.new_path.clone(),
            old_path: plan.old_path.clone(),
            mode: plan.mode,
            failed_step: None,
            duration,
            data_migrated: handoff.data_migrated(),
            step_results,
            rollback_failures: Vec::new(),
            audit_summary,
        };

        let Err(err) = run.outcome else {
            info!(
                %transaction_id,
                new = %plan.new_path.display(),
                data_migrated = result.data_migrated,
                elapsed_ms = duration.as_millis(),
                "storage relocation completed"
            );
            return result;
        };

        let failed_step = err.failed_step().to_string();
        let error = OperationError::from(err);
        let message = match error.root_cause().to_string() {
            cause if cause == error.to_string() => cause,
            cause => format!("{error}: {cause}"),
        };
        if let Some((undo, undo_error)) = error.failed_undo() {
            result.rollback_failures.push(RollbackSummary {
                step: failed_step.clone(),
                description: undo.to_string(),
                error_message: undo_error.to_string(),
            });
        }
        if let OperationError::RollbackFailed {
            rollback_failures, ..
        } = &error
        {
            result
                .rollback_failures
                .extend(rollback_failures.iter().map(|f| RollbackSummary {
                    step: f.step.clone(),
                    description: f.description.clone(),
                    error_message: f.error.to_string(),
                }));
        }
        if result.rollback_failures.is_empty() {
            warn!(
                %transaction_id,
                step = %failed_step,
                "{message}; all completed steps were rolled back\n{}",
                result.audit_summary
            );
        } else {
            error!(
                %transaction_id,
                step = %failed_step,
                failures = result.rollback_failures.len(),
                "{message}; the storage location may be inconsistent and needs manual attention\n{}",
                result.audit_summary
            );
        }

        result.success = false;
        result.error_message = Some(message);
        result.error = Some(error);
        result.failed_step = Some(failed_step);
        result
    }
}
