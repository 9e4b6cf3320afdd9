mod configuration;
mod data_migrator;
mod disk_space;
mod file_watcher;
mod root_path;
mod validator;

pub use configuration::ConfigurationStore;
pub use data_migrator::{DataMigrator, MigrationReport};
pub use disk_space::DiskSpaceProbe;
pub use file_watcher::FileWatcher;
pub use root_path::RootPathRegistry;
pub use validator::{StorageValidator, ValidationReport};
