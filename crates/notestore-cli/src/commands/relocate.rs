use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use notestore_core::StorageMode;
use notestore_operations::operations::{
    ApplyOutcome, ProgressSink, SettingsCoordinator, StorageSettings,
};

use crate::environment::Storage;
use crate::error::{CliError, Result};
use crate::output;

#[derive(Args)]
pub(crate) struct RelocateArgs {
    /// New storage directory; created if missing
    path: PathBuf,

    /// Storage mode to use at the new location (default: keep current)
    #[arg(long, value_enum)]
    mode: Option<StorageMode>,

    /// Leave the data at the old location after moving
    #[arg(long, conflicts_with = "discard_original")]
    keep_original: bool,

    /// Delete the data at the old location after a successful move
    #[arg(long)]
    discard_original: bool,

    /// New autosave interval in seconds
    #[arg(long, value_name = "SECS")]
    autosave_interval: Option<u64>,

    /// Do not report progress
    #[arg(long, short)]
    quiet: bool,
}

impl RelocateArgs {
    fn keep_original_data(&self, configured: bool) -> bool {
        if self.keep_original {
            true
        } else if self.discard_original {
            false
        } else {
            configured
        }
    }
}

pub(crate) fn run(config_path: &Path, args: &RelocateArgs) -> Result<()> {
    let storage = Storage::open(config_path)?;
    let target = std::path::absolute(&args.path)?;

    let current = StorageSettings::load(
        storage.configuration.as_ref(),
        storage.manager.current_path(),
    );
    let proposed = StorageSettings {
        storage_path: target.clone(),
        mode: args.mode.unwrap_or(current.mode),
        autosave_interval_secs: args
            .autosave_interval
            .unwrap_or(current.autosave_interval_secs),
    };
    let keep_original_data =
        args.keep_original_data(storage.config.relocation.keep_original_data);

    let coordinator = SettingsCoordinator::new(Arc::clone(&storage.manager));
    let sink = output::print_progress;
    let progress: Option<&dyn ProgressSink> = if args.quiet { None } else { Some(&sink) };

    match coordinator.apply(&current, &proposed, keep_original_data, progress)? {
        ApplyOutcome::Unchanged => println!("Storage settings unchanged."),
        ApplyOutcome::SettingsWritten => println!(
            "Autosave interval set to {}s.",
            proposed.autosave_interval_secs
        ),
        ApplyOutcome::Relocated { mut result, .. } => {
            if !result.success {
                output::print_failure(&result);
                return Err(CliError::RelocationFailed {
                    path: target,
                    source: result.error.take(),
                });
            }
            output::print_success(&result);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(keep_original: bool, discard_original: bool) -> RelocateArgs {
        RelocateArgs {
            path: PathBuf::from("/notes"),
            mode: None,
            keep_original,
            discard_original,
            autosave_interval: None,
            quiet: true,
        }
    }

    #[test]
    fn explicit_flags_override_configured_default() {
        assert!(args(true, false).keep_original_data(false));
        assert!(!args(false, true).keep_original_data(true));
    }

    #[test]
    fn configured_default_applies_without_flags() {
        assert!(args(false, false).keep_original_data(true));
        assert!(!args(false, false).keep_original_data(false));
    }
}
