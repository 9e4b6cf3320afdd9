use notestore_core::is_same_location;
use notestore_operations::operations::{TransactionProgress, TransactionResult};

pub(crate) fn print_progress(progress: &TransactionProgress) {
    let phase = if progress.rolling_back {
        "rolling back: "
    } else {
        ""
    };
    eprintln!(
        "[{:>3.0}%] {phase}{}",
        progress.percent_complete, progress.current_operation
    );
}

pub(crate) fn print_success(result: &TransactionResult) {
    if is_same_location(&result.old_path, &result.new_path) {
        println!(
            "Storage mode set to {} at '{}'.",
            result.mode,
            result.new_path.display()
        );
    } else {
        println!(
            "Storage moved from '{}' to '{}' ({} mode).",
            result.old_path.display(),
            result.new_path.display(),
            result.mode
        );
    }
    println!(
        "Data migrated: {}",
        if result.data_migrated { "yes" } else { "no" }
    );
    println!();
    println!("Steps:");
    for step in result.step_results.values() {
        println!("  {} ({:.1?})", step.description, step.duration);
    }
}

pub(crate) fn print_failure(result: &TransactionResult) {
    if let Some(step) = &result.failed_step {
        eprintln!("Failed step: {step}");
    }

    if result.is_consistent() {
        eprintln!(
            "Storage remains at '{}'; every completed step was rolled back.",
            result.old_path.display()
        );
    } else {
        eprintln!("Rollback incomplete, storage may be inconsistent:");
        for failure in &result.rollback_failures {
            eprintln!("  {}: {}", failure.description, failure.error_message);
        }
    }

    if !result.audit_summary.is_empty() {
        eprintln!();
        eprintln!("Audit trail:");
        for line in result.audit_summary.lines() {
            eprintln!("  {line}");
        }
    }
}
