use std::path::Path;

use crate::Result;
use crate::error::OperationError;
use crate::traits::DiskSpaceProbe;

/// Free-space probe backed by `fs2`.
///
/// Paths that do not exist yet are measured on their nearest existing
/// ancestor, which is where they would be created.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fs2DiskSpaceProbe;

impl DiskSpaceProbe for Fs2DiskSpaceProbe {
    fn available_bytes(&self, path: &Path) -> Result<u64> {
        let existing = path
            .ancestors()
            .find(|p| p.exists())
            .unwrap_or(path);
        fs2::available_space(existing).map_err(|source| OperationError::DiskSpaceQuery {
            path: path.to_path_buf(),
            source,
        })
    }
}
