use std::path::{Path, PathBuf};

use clap::Args;
use notestore_core::StorageMode;
use notestore_operations::operations::validate_location;

use crate::environment::Storage;
use crate::error::{CliError, Result};

#[derive(Args)]
pub(crate) struct ValidateArgs {
    /// Candidate storage directory
    path: PathBuf,

    /// Storage mode the directory would be used with
    #[arg(long, value_enum, default_value_t = StorageMode::Local)]
    mode: StorageMode,
}

pub(crate) fn run(config_path: &Path, args: &ValidateArgs) -> Result<()> {
    let storage = Storage::open(config_path)?;
    let path = std::path::absolute(&args.path)?;

    let report = validate_location(storage.manager.context(), &path, args.mode);

    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    for error in &report.errors {
        println!("error: {error}");
    }
    if !report.is_valid() {
        return Err(CliError::InvalidLocation(path));
    }

    println!(
        "'{}' is a valid {} storage location.",
        path.display(),
        args.mode
    );
    Ok(())
}
