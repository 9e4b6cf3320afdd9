use std::path::Path;

use crate::Result;

pub trait DiskSpaceProbe: Send + Sync {
    /// Bytes available to the current user on the volume holding `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume cannot be queried.
    fn available_bytes(&self, path: &Path) -> Result<u64>;
}
