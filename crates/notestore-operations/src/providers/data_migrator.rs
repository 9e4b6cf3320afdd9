use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::Result;
use crate::error::OperationError;
use crate::traits::{DataMigrator, MigrationReport};

/// Copies storage trees on the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemDataMigrator;

impl FileSystemDataMigrator {
    fn copy_dir(from: &Path, to: &Path, report: &mut MigrationReport) -> Result<()> {
        if !to.exists() {
            fs::create_dir(to).map_err(|source| OperationError::MigrationCopy {
                path: to.to_path_buf(),
                source,
            })?;
            report.created_dirs.push(to.to_path_buf());
        }

        let mut entries = fs::read_dir(from)
            .and_then(|entries| entries.collect::<io::Result<Vec<_>>>())
            .map_err(|source| OperationError::MigrationCopy {
                path: from.to_path_buf(),
                source,
            })?;
        entries.sort_by_key(fs::DirEntry::file_name);

        for entry in entries {
            let source_path = entry.path();
            let target_path = to.join(entry.file_name());
            let file_type = entry
                .file_type()
                .map_err(|source| OperationError::MigrationCopy {
                    path: source_path.clone(),
                    source,
                })?;

            if file_type.is_dir() {
                Self::copy_dir(&source_path, &target_path, report)?;
            } else if file_type.is_file() {
                if target_path.exists() {
                    report.skipped += 1;
                    continue;
                }
                fs::copy(&source_path, &target_path).map_err(|source| {
                    OperationError::MigrationCopy {
                        path: source_path.clone(),
                        source,
                    }
                })?;
                report.created_files.push(target_path);
            } else {
                debug!(path = %source_path.display(), "skipping non-regular file");
            }
        }
        Ok(())
    }
}

impl DataMigrator for FileSystemDataMigrator {
    fn copy_tree(&self, from: &Path, to: &Path, report: &mut MigrationReport) -> Result<()> {
        if !from.exists() {
            debug!(from = %from.display(), "nothing to migrate");
            return Ok(());
        }
        Self::copy_dir(from, to, report)?;
        debug!(
            from = %from.display(),
            to = %to.display(),
            files = report.created_files.len(),
            skipped = report.skipped,
            "copied storage tree"
        );
        Ok(())
    }

    fn undo(&self, report: &MigrationReport) -> Result<()> {
        for file in report.created_files.iter().rev() {
            match fs::remove_file(file) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(OperationError::MigrationRemove {
                        path: file.clone(),
                        source,
                    });
                }
            }
        }
        for dir in report.created_dirs.iter().rev() {
            match fs::remove_dir(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "left created directory in place");
                }
            }
        }
        Ok(())
    }

    fn remove_tree(&self, root: &Path) -> Result<()> {
        match fs::remove_dir_all(root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(OperationError::MigrationRemove {
                path: root.to_path_buf(),
                source,
            }),
        }
    }
}
