use std::path::{Path, PathBuf};

use notestore_core::StorageMode;

use crate::Result;

/// User-level storage configuration.
///
/// Setters only change the in-memory values; [`persist`](Self::persist)
/// writes them to durable storage.
pub trait ConfigurationStore: Send + Sync {
    fn default_path(&self) -> Option<PathBuf>;

    fn set_default_path(&self, path: Option<&Path>);

    fn metadata_path(&self) -> Option<PathBuf>;

    fn set_metadata_path(&self, path: Option<&Path>);

    fn storage_mode(&self) -> StorageMode;

    fn set_storage_mode(&self, mode: StorageMode);

    fn autosave_interval_secs(&self) -> u64;

    fn set_autosave_interval_secs(&self, secs: u64);

    /// Write the current values to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the values cannot be serialized or written.
    fn persist(&self) -> Result<()>;
}
