use std::path::{Path, PathBuf};

use crate::Result;

/// What a copy created in the target tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Files created in the target, in creation order.
    pub created_files: Vec<PathBuf>,
    /// Directories created in the target, parents before children.
    pub created_dirs: Vec<PathBuf>,
    /// Files left alone because the target already had them.
    pub skipped: usize,
}

impl MigrationReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created_files.is_empty() && self.created_dirs.is_empty()
    }
}

/// Moves note data between storage roots.
pub trait DataMigrator: Send + Sync {
    /// Copy every file below `from` into the same relative location below
    /// `to`, never overwriting existing files.
    ///
    /// Everything created is recorded in `report`, including on failure, so
    /// the caller can undo a partial copy.
    ///
    /// # Errors
    ///
    /// Returns an error on the first file or directory that cannot be copied.
    fn copy_tree(&self, from: &Path, to: &Path, report: &mut MigrationReport) -> Result<()>;

    /// Remove the files and then the directories listed in `report`.
    /// Directories that are no longer empty are left in place.
    ///
    /// # Errors
    ///
    /// Returns an error if a listed file exists but cannot be removed.
    fn undo(&self, report: &MigrationReport) -> Result<()>;

    /// Remove a whole storage tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree exists but cannot be removed.
    fn remove_tree(&self, root: &Path) -> Result<()>;
}
