use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use notestore_core::StorageMode;
use tracing::debug;

use crate::Result;
use crate::config::NotestoreConfig;
use crate::error::OperationError;
use crate::traits::ConfigurationStore;

/// Configuration backed by a TOML file.
///
/// A missing file loads as the default configuration and is created on the
/// first [`persist`](ConfigurationStore::persist).
pub struct TomlConfigurationStore {
    path: PathBuf,
    config: RwLock<NotestoreConfig>,
}

impl TomlConfigurationStore {
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = load_toml_file(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            config: RwLock::new(config),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the whole configuration, including relocation tuning.
    #[must_use]
    pub fn config(&self) -> NotestoreConfig {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, NotestoreConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, NotestoreConfig> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConfigurationStore for TomlConfigurationStore {
    fn default_path(&self) -> Option<PathBuf> {
        self.read().storage.default_path.clone()
    }

    fn set_default_path(&self, path: Option<&Path>) {
        self.write().storage.default_path = path.map(Path::to_path_buf);
    }

    fn metadata_path(&self) -> Option<PathBuf> {
        self.read().storage.metadata_path.clone()
    }

    fn set_metadata_path(&self, path: Option<&Path>) {
        self.write().storage.metadata_path = path.map(Path::to_path_buf);
    }

    fn storage_mode(&self) -> StorageMode {
        self.read().storage.mode
    }

    fn set_storage_mode(&self, mode: StorageMode) {
        self.write().storage.mode = mode;
    }

    fn autosave_interval_secs(&self) -> u64 {
        self.read().storage.autosave_interval_secs
    }

    fn set_autosave_interval_secs(&self, secs: u64) {
        self.write().storage.autosave_interval_secs = secs;
    }

    fn persist(&self) -> Result<()> {
        let config = self.config();
        save_toml_file(&self.path, &config)?;
        debug!(path = %self.path.display(), "persisted configuration");
        Ok(())
    }
}

fn load_toml_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|source| OperationError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    let config = toml::from_str(&content).map_err(|source| OperationError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(config))
}

fn save_toml_file<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let content =
        toml::to_string_pretty(value).map_err(|source| OperationError::ConfigSerialize {
            path: path.to_path_buf(),
            source,
        })?;

    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    };
    write().map_err(|source| OperationError::ConfigWrite {
        path: path.to_path_buf(),
        source,
    })
}
