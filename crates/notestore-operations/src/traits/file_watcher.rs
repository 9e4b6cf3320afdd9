use std::path::{Path, PathBuf};

use crate::Result;

/// Watches the storage directory for external changes.
pub trait FileWatcher: Send + Sync {
    /// Stop every active watch. Stopping with nothing watched is a no-op.
    fn stop_all(&self);

    /// Start watching `path` for files matching the glob `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter is invalid or the directory cannot be
    /// watched.
    fn start_watching(&self, path: &Path, filter: &str, recursive: bool) -> Result<()>;

    /// Directory currently being watched, if any.
    fn watched_directory(&self) -> Option<PathBuf>;
}
