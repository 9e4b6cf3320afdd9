use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use globset::Glob;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::Result;
use crate::error::OperationError;
use crate::traits::FileWatcher;

type ChangeHandler = Arc<dyn Fn(&Path) + Send + Sync>;

struct ActiveWatch {
    directory: PathBuf,
    _watcher: RecommendedWatcher,
}

/// File watcher backed by the platform's native notification API.
///
/// Only one directory is watched at a time; starting a new watch replaces
/// the previous one. Changes to files whose name matches the filter are
/// passed to the change handler.
pub struct NotifyFileWatcher {
    active: Mutex<Option<ActiveWatch>>,
    on_change: ChangeHandler,
}

impl NotifyFileWatcher {
    pub fn new(on_change: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        Self {
            active: Mutex::new(None),
            on_change: Arc::new(on_change),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveWatch>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for NotifyFileWatcher {
    fn default() -> Self {
        Self::new(|path| debug!(path = %path.display(), "storage file changed"))
    }
}

impl FileWatcher for NotifyFileWatcher {
    fn stop_all(&self) {
        if let Some(active) = self.lock().take() {
            debug!(directory = %active.directory.display(), "stopped watching");
        }
    }

    fn start_watching(&self, path: &Path, filter: &str, recursive: bool) -> Result<()> {
        let matcher = Glob::new(filter)
            .map_err(|source| OperationError::WatchFilter {
                pattern: filter.to_string(),
                source,
            })?
            .compile_matcher();
        let handler = Arc::clone(&self.on_change);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) if event.kind.is_access() => {}
                Ok(event) => {
                    for changed in &event.paths {
                        if changed.file_name().is_some_and(|name| matcher.is_match(name)) {
                            handler(changed);
                        }
                    }
                }
                Err(e) => warn!(error = %e, "file watcher error"),
            }
        })
        .map_err(|source| OperationError::Watch {
            path: path.to_path_buf(),
            source,
        })?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(path, mode)
            .map_err(|source| OperationError::Watch {
                path: path.to_path_buf(),
                source,
            })?;

        let previous = self.lock().replace(ActiveWatch {
            directory: path.to_path_buf(),
            _watcher: watcher,
        });
        if let Some(previous) = previous {
            debug!(directory = %previous.directory.display(), "replaced previous watch");
        }
        info!(directory = %path.display(), filter, recursive, "watching storage directory");
        Ok(())
    }

    fn watched_directory(&self) -> Option<PathBuf> {
        self.lock().as_ref().map(|active| active.directory.clone())
    }
}
