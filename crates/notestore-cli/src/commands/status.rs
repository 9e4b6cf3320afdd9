use std::path::Path;

use notestore_operations::config::metadata_path_for;
use notestore_operations::traits::ConfigurationStore;

use crate::environment::load_configuration;
use crate::error::Result;

pub(crate) fn run(config_path: &Path) -> Result<()> {
    let configuration = load_configuration(config_path)?;

    let Some(root) = configuration.default_path() else {
        println!("No storage location configured.");
        println!("Configuration: {}", config_path.display());
        return Ok(());
    };

    let metadata = configuration
        .metadata_path()
        .unwrap_or_else(|| metadata_path_for(&root));
    let exists = if root.is_dir() { "" } else { " (missing)" };

    println!("Storage location: {}{exists}", root.display());
    println!("Mode: {}", configuration.storage_mode());
    println!("Metadata: {}", metadata.display());
    println!(
        "Autosave interval: {}s",
        configuration.autosave_interval_secs()
    );
    println!("Configuration: {}", config_path.display());
    Ok(())
}
