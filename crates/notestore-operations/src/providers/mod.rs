mod configuration;
mod data_migrator;
mod disk_space;
mod file_watcher;
mod root_path;

pub use configuration::TomlConfigurationStore;
pub use data_migrator::FileSystemDataMigrator;
pub use disk_space::Fs2DiskSpaceProbe;
pub use file_watcher::NotifyFileWatcher;
pub use root_path::{InMemoryRootPath, ProcessRootPath};
