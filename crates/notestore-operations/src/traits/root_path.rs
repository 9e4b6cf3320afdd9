use std::path::{Path, PathBuf};

/// Process-wide record of the storage root other components resolve
/// relative paths against.
pub trait RootPathRegistry: Send + Sync {
    fn root_path(&self) -> Option<PathBuf>;

    fn set_root_path(&self, path: &Path);

    /// Forget the root so later lookups see no root at all.
    fn clear_root_path(&self);
}
