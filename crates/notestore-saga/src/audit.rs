use std::time::Instant;

use crate::state::StepId;

/// Status of a step in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuditStatus {
    /// Step executed successfully.
    Executed,
    /// Step failed during execution.
    Failed,
    /// Step was rolled back successfully.
    RolledBack,
    /// Step rollback failed.
    RollbackFailed,
    /// Step completed but cannot be undone, so rollback left it in place.
    RollbackSkipped,
}

/// Record of a step's execution in the transaction.
#[derive(Debug)]
pub struct AuditRecord {
    pub step_id: StepId,
    /// Description of the step.
    pub description: String,
    pub status: AuditStatus,
    /// Position in the global event order of this log.
    pub executed_seq: u64,
    /// Position of the rollback in the global event order, if one happened.
    pub rollback_seq: Option<u64>,
    pub started_at: Instant,
    /// When the step finished executing or rolling back.
    pub completed_at: Option<Instant>,
    pub rollback_description: Option<String>,
}

/// Ordered log of every execution and rollback in a transaction.
#[derive(Debug, Default)]
pub struct TransactionAuditLog {
    records: Vec<AuditRecord>,
    next_seq: u64,
}

impl TransactionAuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub(crate) fn record_start(&mut self, step_id: StepId, description: &str) {
        let executed_seq = self.next_seq();
        self.records.push(AuditRecord {
            step_id,
            description: description.to_string(),
            status: AuditStatus::Executed,
            executed_seq,
            rollback_seq: None,
            started_at: Instant::now(),
            completed_at: None,
            rollback_description: None,
        });
    }

    pub(crate) fn record_success(&mut self, rollback_description: Option<String>) {
        if let Some(record) = self.records.last_mut() {
            record.status = AuditStatus::Executed;
            record.completed_at = Some(Instant::now());
            record.rollback_description = rollback_description;
        }
    }

    pub(crate) fn record_failure(&mut self) {
        if let Some(record) = self.records.last_mut() {
            record.status = AuditStatus::Failed;
            record.completed_at = Some(Instant::now());
        }
    }

    pub(crate) fn record_rollback(&mut self, step_id: StepId, status: AuditStatus) {
        let seq = self.next_seq();
        if let Some(record) = self.records.iter_mut().find(|r| r.step_id == step_id) {
            record.status = status;
            record.rollback_seq = Some(seq);
            record.completed_at = Some(Instant::now());
        }
    }

    #[must_use]
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Steps that were rolled back (successfully or not), in rollback order.
    #[must_use]
    pub fn rollback_order(&self) -> Vec<StepId> {
        let mut rolled: Vec<&AuditRecord> = self
            .records
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    AuditStatus::RolledBack | AuditStatus::RollbackFailed
                )
            })
            .collect();
        rolled.sort_by_key(|r| r.rollback_seq);
        rolled.into_iter().map(|r| r.step_id).collect()
    }

    /// One line per step, for logs and terminal output.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                AuditStatus::Executed => "✓",
                AuditStatus::Failed => "✗",
                AuditStatus::RolledBack => "↩",
                AuditStatus::RollbackFailed => "⚠",
                AuditStatus::RollbackSkipped => "·",
            };
            lines.push(format!("{status} {}", record.description));
        }
        lines.join("\n")
    }
}
