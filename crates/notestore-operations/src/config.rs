use std::path::PathBuf;
use std::time::Duration;

use notestore_core::StorageMode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_FREE_SPACE_MB: u64 = 100;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_WATCH_FILTER: &str = "*.rtf";
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Directory below a storage root that holds index and metadata files.
pub const METADATA_DIR: &str = ".notestore";

/// On-disk configuration file layout.
///
/// ```toml
/// [storage]
/// default_path = "/home/me/Notes"
/// metadata_path = "/home/me/Notes/.notestore"
/// mode = "local"
/// autosave_interval_secs = 30
///
/// [relocation]
/// min_free_space_mb = 100
/// probe_timeout_ms = 5000
/// watch_filter = "*.rtf"
/// watch_recursive = true
/// keep_original_data = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotestoreConfig {
    pub storage: StorageSection,
    pub relocation: RelocationSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_path: Option<PathBuf>,
    pub mode: StorageMode,
    pub autosave_interval_secs: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            default_path: None,
            metadata_path: None,
            mode: StorageMode::default(),
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelocationSection {
    pub min_free_space_mb: u64,
    pub probe_timeout_ms: u64,
    pub watch_filter: String,
    pub watch_recursive: bool,
    /// Default for whether a relocation leaves the old data in place.
    pub keep_original_data: bool,
}

impl Default for RelocationSection {
    fn default() -> Self {
        Self {
            min_free_space_mb: DEFAULT_MIN_FREE_SPACE_MB,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            watch_filter: DEFAULT_WATCH_FILTER.to_string(),
            watch_recursive: true,
            keep_original_data: true,
        }
    }
}

/// Tuning for a single relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationOptions {
    pub min_free_space_bytes: u64,
    pub probe_timeout: Duration,
    pub watch_filter: String,
    pub watch_recursive: bool,
}

impl Default for RelocationOptions {
    fn default() -> Self {
        Self::from(&RelocationSection::default())
    }
}

impl From<&RelocationSection> for RelocationOptions {
    fn from(section: &RelocationSection) -> Self {
        Self {
            min_free_space_bytes: section.min_free_space_mb.saturating_mul(1024 * 1024),
            probe_timeout: Duration::from_millis(section.probe_timeout_ms),
            watch_filter: section.watch_filter.clone(),
            watch_recursive: section.watch_recursive,
        }
    }
}

/// Metadata directory for a storage root.
#[must_use]
pub fn metadata_path_for(root: &std::path::Path) -> PathBuf {
    root.join(METADATA_DIR)
}
