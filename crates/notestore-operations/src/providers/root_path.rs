use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::traits::RootPathRegistry;

static PROCESS_ROOT: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Handle to the single storage root shared by the whole process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRootPath;

impl RootPathRegistry for ProcessRootPath {
    fn root_path(&self) -> Option<PathBuf> {
        PROCESS_ROOT
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_root_path(&self, path: &Path) {
        *PROCESS_ROOT.write().unwrap_or_else(PoisonError::into_inner) = Some(path.to_path_buf());
    }

    fn clear_root_path(&self) {
        *PROCESS_ROOT.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Root path registry owned by a single instance.
#[derive(Debug, Default)]
pub struct InMemoryRootPath {
    path: RwLock<Option<PathBuf>>,
}

impl InMemoryRootPath {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: RwLock::new(Some(path.into())),
        }
    }
}

impl RootPathRegistry for InMemoryRootPath {
    fn root_path(&self) -> Option<PathBuf> {
        self.path
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_root_path(&self, path: &Path) {
        *self.path.write().unwrap_or_else(PoisonError::into_inner) = Some(path.to_path_buf());
    }

    fn clear_root_path(&self) {
        *self.path.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_registry_tracks_latest_path() {
        let registry = InMemoryRootPath::default();
        assert!(registry.root_path().is_none());

        registry.set_root_path(Path::new("/a"));
        registry.set_root_path(Path::new("/b"));

        assert_eq!(registry.root_path(), Some(PathBuf::from("/b")));
    }

    #[test]
    fn cleared_registry_has_no_root() {
        let registry = InMemoryRootPath::new("/a");

        registry.clear_root_path();

        assert!(registry.root_path().is_none());
    }

    #[test]
    fn process_registry_is_shared_between_handles() {
        let path = PathBuf::from("/process/shared/root");

        ProcessRootPath.set_root_path(&path);

        assert_eq!(ProcessRootPath.root_path(), Some(path));
    }
}
