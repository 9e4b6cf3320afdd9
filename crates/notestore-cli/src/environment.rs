use std::path::Path;
use std::sync::Arc;

use notestore_engine::{FileSaveEngineBuilder, SaveEngineFactory};
use notestore_operations::config::{NotestoreConfig, RelocationOptions};
use notestore_operations::operations::{RelocationContext, StorageTransactionManager};
use notestore_operations::providers::{NotifyFileWatcher, ProcessRootPath, TomlConfigurationStore};
use notestore_operations::traits::{FileWatcher, RootPathRegistry};
use tracing::debug;

use crate::error::{CliError, Result};

/// Loaded configuration without any storage components attached.
pub(crate) fn load_configuration(config_path: &Path) -> Result<TomlConfigurationStore> {
    Ok(TomlConfigurationStore::load(config_path)?)
}

/// Every component a relocation touches, bound to the configured root.
pub(crate) struct Storage {
    pub(crate) configuration: Arc<TomlConfigurationStore>,
    pub(crate) manager: Arc<StorageTransactionManager>,
    pub(crate) config: NotestoreConfig,
}

impl Storage {
    pub(crate) fn open(config_path: &Path) -> Result<Self> {
        let configuration = Arc::new(load_configuration(config_path)?);
        let config = configuration.config();
        let root = config
            .storage
            .default_path
            .clone()
            .ok_or_else(|| CliError::NoStorageRoot(config_path.to_path_buf()))?;

        let factory = SaveEngineFactory::bootstrap(&root, Arc::new(FileSaveEngineBuilder))?;
        let options = RelocationOptions::from(&config.relocation);

        let watcher = Arc::new(NotifyFileWatcher::default());
        watcher.start_watching(&root, &options.watch_filter, options.watch_recursive)?;
        let root_path = Arc::new(ProcessRootPath);
        root_path.set_root_path(&root);
        debug!(root = %root.display(), "storage components ready");

        let context = RelocationContext::new(
            Arc::new(factory),
            configuration.clone(),
            watcher,
            root_path,
        )
        .with_options(options);

        Ok(Self {
            configuration,
            manager: Arc::new(StorageTransactionManager::new(context)),
            config,
        })
    }
}
