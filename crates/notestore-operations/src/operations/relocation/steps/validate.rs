use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use notestore_core::{StorageMode, normalize_path, validate_path_syntax};
use notestore_saga::{StepData, TransactionStep};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use super::RelocationPlan;
use crate::error::OperationError;
use crate::operations::relocation::RelocationContext;
use crate::traits::ValidationReport;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Check whether `path` can become the storage root.
///
/// Path syntax is always checked. A configured [`StorageValidator`] then
/// decides the rest; without one the built-in checks run: the location must
/// be a directory or creatable, writable within the probe timeout, and have
/// the configured minimum of free space. Nothing is left behind on disk, so
/// repeated calls give the same answer.
///
/// [`StorageValidator`]: crate::traits::StorageValidator
#[must_use]
pub fn validate_location(
    ctx: &RelocationContext,
    path: &Path,
    mode: StorageMode,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    if let Err(e) = validate_path_syntax(path) {
        report.error(e.to_string());
        return report;
    }

    if let Some(validator) = ctx.validator() {
        report.merge(validator.validate(path, mode));
        return report;
    }

    if path.exists() && !path.is_dir() {
        report.error(format!("'{}' exists and is not a directory", path.display()));
        return report;
    }
    if mode == StorageMode::MappedCloudFolder && !path.exists() {
        report.warning(format!(
            "'{}' does not exist yet; the cloud folder may not be mapped",
            path.display()
        ));
    }

    let probe_dir = nearest_existing(path);
    if let Err(e) = probe_writable(path, probe_dir, ctx.options().probe_timeout) {
        report.error(describe(&e));
    }

    let required = ctx.options().min_free_space_bytes;
    match ctx.disk_space().available_bytes(path) {
        Ok(available) if available < required => {
            report.error(
                OperationError::InsufficientSpace {
                    path: path.to_path_buf(),
                    available_mb: available / BYTES_PER_MB,
                    required_mb: required / BYTES_PER_MB,
                }
                .to_string(),
            );
        }
        Ok(_) => {}
        Err(e) => report.error(describe(&e)),
    }

    report
}

fn nearest_existing(path: &Path) -> &Path {
    path.ancestors().find(|p| p.is_dir()).unwrap_or(path)
}

/// Write and delete a probe file in `dir`, giving up after `timeout`.
fn probe_writable(target: &Path, dir: &Path, timeout: Duration) -> Result<(), OperationError> {
    let probe = dir.join(format!(".notestore-probe-{}", Uuid::new_v4()));
    let (tx, rx) = mpsc::channel();
    let probe_path = probe.clone();
    // Detached: a probe stuck on an unresponsive volume is abandoned.
    let _probe_thread = thread::Builder::new()
        .name("storage-write-probe".to_string())
        .spawn(move || {
            let result =
                fs::write(&probe_path, b"probe").and_then(|()| fs::remove_file(&probe_path));
            let _ = tx.send(result);
        })
        .map_err(|source| OperationError::NotWritable {
            path: target.to_path_buf(),
            source,
        })?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(())) => {
            debug!(probe = %probe.display(), "write probe succeeded");
            Ok(())
        }
        Ok(Err(source)) => Err(OperationError::NotWritable {
            path: target.to_path_buf(),
            source,
        }),
        Err(_) => Err(OperationError::WriteProbeTimedOut {
            path: target.to_path_buf(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

fn describe(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

pub(crate) struct ValidationStep {
    ctx: RelocationContext,
    plan: Arc<RelocationPlan>,
}

impl ValidationStep {
    pub fn new(ctx: RelocationContext, plan: Arc<RelocationPlan>) -> Self {
        Self { ctx, plan }
    }
}

impl TransactionStep for ValidationStep {
    type Error = OperationError;

    fn description(&self) -> &str {
        "validate storage location"
    }

    fn can_rollback(&self) -> bool {
        false
    }

    fn execute(&mut self) -> Result<StepData, Self::Error> {
        let plan = &self.plan;
        let mut report = validate_location(&self.ctx, &plan.new_path, plan.mode);

        if !plan.same_location
            && normalize_path(&plan.new_path).starts_with(normalize_path(&plan.old_path))
        {
            report.error(format!(
                "'{}' is inside the current storage location '{}'",
                plan.new_path.display(),
                plan.old_path.display()
            ));
        }

        if !report.is_valid() {
            return Err(OperationError::ValidationFailed {
                path: plan.new_path.clone(),
                errors: report.errors,
            });
        }
        for warning in &report.warnings {
            warn!(path = %plan.new_path.display(), "{warning}");
        }
        Ok(json!({
            "path": plan.new_path,
            "mode": plan.mode.to_string(),
            "warnings": report.warnings,
        }))
    }

    fn rollback_description(&self) -> String {
        "nothing to undo for validation".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::mocks::{MockValidator, TestRig};

    #[test]
    fn writable_location_with_space_is_valid() {
        let rig = TestRig::new();

        let report = validate_location(&rig.context(), &rig.new_path(), StorageMode::Local);

        assert!(report.is_valid(), "{:?}", report.errors);
    }

    #[test]
    fn validation_is_idempotent_and_leaves_nothing_behind() {
        let rig = TestRig::new();
        let ctx = rig.context();

        let first = validate_location(&ctx, &rig.new_path(), StorageMode::Local);
        let second = validate_location(&ctx, &rig.new_path(), StorageMode::Local);

        assert_eq!(first, second);
        assert!(!rig.new_path().exists());
        assert_eq!(
            fs::read_dir(rig.new_parent()).expect("list").count(),
            0,
            "probe file must be removed"
        );
    }

    #[test]
    fn relative_path_is_rejected() {
        let rig = TestRig::new();

        let report = validate_location(&rig.context(), Path::new("notes"), StorageMode::Local);

        assert!(!report.is_valid());
        assert!(report.errors[0].contains("absolute"));
    }

    #[test]
    fn file_in_place_of_directory_is_rejected() {
        let rig = TestRig::new();
        fs::write(rig.new_path(), "not a directory").expect("write");

        let report = validate_location(&rig.context(), &rig.new_path(), StorageMode::Local);

        assert!(report.errors[0].contains("not a directory"));
    }

    #[test]
    fn low_free_space_is_rejected() {
        let rig = TestRig::new();
        rig.disk_space.set_available(50 * BYTES_PER_MB);

        let report = validate_location(&rig.context(), &rig.new_path(), StorageMode::Local);

        assert!(!report.is_valid());
        assert!(report.errors[0].contains("50 MB available, 100 MB required"));
    }

    #[test]
    fn cloud_mode_warns_about_missing_folder() {
        let rig = TestRig::new();

        let report = validate_location(
            &rig.context(),
            &rig.new_path(),
            StorageMode::MappedCloudFolder,
        );

        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn pluggable_validator_replaces_builtin_checks() {
        let rig = TestRig::new();
        rig.disk_space.set_available(0);
        let validator = Arc::new(MockValidator::rejecting("share is offline"));
        let ctx = rig.context().with_validator(validator.clone());

        let report = validate_location(&ctx, &rig.new_path(), StorageMode::MappedCloudFolder);

        assert_eq!(report.errors, vec!["share is offline".to_string()]);
        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn step_rejects_target_nested_in_current_root() {
        let rig = TestRig::new();
        let nested = rig.old_path().join("inner");
        let mut step = ValidationStep::new(rig.context(), Arc::new(rig.plan(&nested)));

        let err = step.execute().expect_err("nested target");

        assert!(err.to_string().contains("failed validation"));
        assert!(matches!(err, OperationError::ValidationFailed { ref errors, .. } if errors[0].contains("inside")));
    }

    #[test]
    fn step_reports_path_and_mode() {
        let rig = TestRig::new();
        let mut step = ValidationStep::new(rig.context(), Arc::new(rig.plan(&rig.new_path())));

        let data = step.execute().expect("valid");

        assert_eq!(data["mode"], "local");
        assert!(!step.can_rollback());
    }
}
