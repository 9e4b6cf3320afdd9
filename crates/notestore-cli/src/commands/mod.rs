mod relocate;
mod status;
mod validate;

use std::path::Path;

use clap::Subcommand;

use crate::error::Result;

pub(crate) use relocate::RelocateArgs;
pub(crate) use validate::ValidateArgs;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Show the configured storage location
    Status,
    /// Check whether a directory can become the storage location
    Validate(ValidateArgs),
    /// Move the storage location, rolling back on failure
    Relocate(RelocateArgs),
}

impl Commands {
    pub(crate) fn execute(self, config_path: &Path) -> Result<()> {
        match self {
            Self::Status => status::run(config_path),
            Self::Validate(args) => validate::run(config_path, &args),
            Self::Relocate(args) => relocate::run(config_path, &args),
        }
    }
}
