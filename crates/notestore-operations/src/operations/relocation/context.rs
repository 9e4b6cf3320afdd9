use std::sync::Arc;

use notestore_engine::SaveEngineFactory;

use crate::config::RelocationOptions;
use crate::providers::{Fs2DiskSpaceProbe, FileSystemDataMigrator};
use crate::traits::{
    ConfigurationStore, DataMigrator, DiskSpaceProbe, FileWatcher, RootPathRegistry,
    StorageValidator,
};

/// Collaborators shared by every step of a relocation.
#[derive(Clone)]
pub struct RelocationContext {
    factory: Arc<SaveEngineFactory>,
    configuration: Arc<dyn ConfigurationStore>,
    watcher: Arc<dyn FileWatcher>,
    root_path: Arc<dyn RootPathRegistry>,
    migrator: Arc<dyn DataMigrator>,
    disk_space: Arc<dyn DiskSpaceProbe>,
    validator: Option<Arc<dyn StorageValidator>>,
    options: RelocationOptions,
}

impl RelocationContext {
    /// Context using the file-system migrator and `fs2` free-space probe.
    pub fn new(
        factory: Arc<SaveEngineFactory>,
        configuration: Arc<dyn ConfigurationStore>,
        watcher: Arc<dyn FileWatcher>,
        root_path: Arc<dyn RootPathRegistry>,
    ) -> Self {
        Self {
            factory,
            configuration,
            watcher,
            root_path,
            migrator: Arc::new(FileSystemDataMigrator),
            disk_space: Arc::new(Fs2DiskSpaceProbe),
            validator: None,
            options: RelocationOptions::default(),
        }
    }

    #[must_use]
    pub fn with_migrator(mut self, migrator: Arc<dyn DataMigrator>) -> Self {
        self.migrator = migrator;
        self
    }

    #[must_use]
    pub fn with_disk_space(mut self, disk_space: Arc<dyn DiskSpaceProbe>) -> Self {
        self.disk_space = disk_space;
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn StorageValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: RelocationOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn factory(&self) -> &SaveEngineFactory {
        &self.factory
    }

    #[must_use]
    pub fn configuration(&self) -> &dyn ConfigurationStore {
        self.configuration.as_ref()
    }

    #[must_use]
    pub fn watcher(&self) -> &dyn FileWatcher {
        self.watcher.as_ref()
    }

    #[must_use]
    pub fn root_path(&self) -> &dyn RootPathRegistry {
        self.root_path.as_ref()
    }

    #[must_use]
    pub fn migrator(&self) -> &dyn DataMigrator {
        self.migrator.as_ref()
    }

    #[must_use]
    pub fn disk_space(&self) -> &dyn DiskSpaceProbe {
        self.disk_space.as_ref()
    }

    #[must_use]
    pub fn validator(&self) -> Option<&dyn StorageValidator> {
        self.validator.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> &RelocationOptions {
        &self.options
    }
}
