use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::Result;
use crate::engine::SaveEngine;
use crate::state::SaveEngineState;

/// Constructs save engines bound to a data root.
pub trait SaveEngineBuilder: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if no engine can be bound to `root`.
    fn build(&self, root: &Path) -> Result<Arc<dyn SaveEngine>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceReason {
    /// A new engine was activated.
    Swap,
    /// A captured engine was put back by rollback.
    Restore,
}

/// Notification that the active engine changed.
pub struct EngineReplaced {
    pub old: Arc<dyn SaveEngine>,
    pub new: Arc<dyn SaveEngine>,
    pub new_path: PathBuf,
    pub reason: ReplaceReason,
}

/// Components that hold on to the active engine and must re-bind when it
/// changes (open editor tabs, background sync).
pub trait EngineReplacedListener: Send + Sync {
    fn on_engine_replaced(&self, event: &EngineReplaced);
}

impl<F> EngineReplacedListener for F
where
    F: Fn(&EngineReplaced) + Send + Sync,
{
    fn on_engine_replaced(&self, event: &EngineReplaced) {
        self(event);
    }
}

/// Owner of the process-wide active save engine.
///
/// Readers call [`current`](Self::current) and always see a whole engine;
/// replacement is a single assignment under a write lock. Replace, capture
/// and restore are additionally serialized against each other.
pub struct SaveEngineFactory {
    current: RwLock<Arc<dyn SaveEngine>>,
    builder: Arc<dyn SaveEngineBuilder>,
    listeners: RwLock<Vec<Arc<dyn EngineReplacedListener>>>,
    swap_lock: Mutex<()>,
}

impl SaveEngineFactory {
    #[must_use]
    pub fn new(initial: Arc<dyn SaveEngine>, builder: Arc<dyn SaveEngineBuilder>) -> Self {
        Self {
            current: RwLock::new(initial),
            builder,
            listeners: RwLock::new(Vec::new()),
            swap_lock: Mutex::new(()),
        }
    }

    /// Build the initial engine for `root` with `builder` and make it active.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder cannot bind an engine to `root`.
    pub fn bootstrap(root: &Path, builder: Arc<dyn SaveEngineBuilder>) -> Result<Self> {
        let initial = builder.build(root)?;
        Ok(Self::new(initial, builder))
    }

    /// The active engine.
    #[must_use]
    pub fn current(&self) -> Arc<dyn SaveEngine> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*current)
    }

    #[must_use]
    pub fn is_current(&self, engine: &Arc<dyn SaveEngine>) -> bool {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::ptr_eq(&*current, engine)
    }

    pub fn subscribe(&self, listener: Arc<dyn EngineReplacedListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Construct a new engine bound to `path` without activating it.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is inaccessible or the engine cannot be built.
    pub fn create(&self, path: &Path) -> Result<Arc<dyn SaveEngine>> {
        let engine = self.builder.build(path)?;
        debug!(path = %path.display(), "created save engine");
        Ok(engine)
    }

    /// Make `new_engine` the active engine, returning the previous one.
    pub fn replace(&self, new_engine: Arc<dyn SaveEngine>) -> Arc<dyn SaveEngine> {
        let _guard = self.swap_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let old = self.swap_current(Arc::clone(&new_engine));
        info!(
            old = %old.data_root().display(),
            new = %new_engine.data_root().display(),
            "replaced active save engine"
        );
        self.notify(&EngineReplaced {
            old: Arc::clone(&old),
            new_path: new_engine.data_root().to_path_buf(),
            new: new_engine,
            reason: ReplaceReason::Swap,
        });
        old
    }

    /// Snapshot the active engine and its document state.
    #[must_use]
    pub fn capture_state(&self) -> SaveEngineState {
        let _guard = self.swap_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let state = SaveEngineState::capture(self.current());
        debug!(
            root = %state.data_root().display(),
            documents = state.document_count(),
            "captured save engine state"
        );
        state
    }

    /// Reactivate the engine captured in `state` and restore its documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the captured engine refuses the document state,
    /// e.g. because it was disposed. The active engine is left unchanged in
    /// that case.
    pub fn restore_state(&self, state: &SaveEngineState) -> Result<()> {
        let _guard = self.swap_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let engine = Arc::clone(state.engine());
        engine.restore_documents(&state.documents(), &state.pending_wal_entries)?;
        let old = self.swap_current(Arc::clone(&engine));
        info!(
            root = %state.data_root().display(),
            documents = state.document_count(),
            "restored save engine state"
        );
        if !Arc::ptr_eq(&old, &engine) {
            self.notify(&EngineReplaced {
                old,
                new_path: state.data_root().to_path_buf(),
                new: engine,
                reason: ReplaceReason::Restore,
            });
        }
        Ok(())
    }

    fn swap_current(&self, engine: Arc<dyn SaveEngine>) -> Arc<dyn SaveEngine> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, engine)
    }

    fn notify(&self, event: &EngineReplaced) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            let delivered =
                panic::catch_unwind(AssertUnwindSafe(|| listener.on_engine_replaced(event)));
            if let Err(payload) = delivered {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|m| (*m).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_default();
                warn!(panic = %message, "engine replacement listener panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::file_engine::{FileSaveEngine, FileSaveEngineBuilder};
    use tempfile::TempDir;

    fn factory() -> (TempDir, TempDir, SaveEngineFactory) {
        let old = tempfile::tempdir().expect("temp dir");
        let new = tempfile::tempdir().expect("temp dir");
        let factory = SaveEngineFactory::bootstrap(old.path(), Arc::new(FileSaveEngineBuilder))
            .expect("bootstrap");
        (old, new, factory)
    }

    #[test]
    fn create_does_not_activate() {
        let (_old, new, factory) = factory();
        let before = factory.current();

        let created = factory.create(new.path()).expect("create");

        assert!(factory.is_current(&before));
        assert!(!factory.is_current(&created));
    }

    #[test]
    fn create_fails_for_inaccessible_path() {
        let (_old, new, factory) = factory();

        assert!(factory.create(&new.path().join("missing")).is_err());
    }

    #[test]
    fn replace_activates_new_engine_and_returns_old() {
        let (old_dir, new, factory) = factory();
        let original = factory.current();
        let created = factory.create(new.path()).expect("create");

        let previous = factory.replace(Arc::clone(&created));

        assert!(Arc::ptr_eq(&previous, &original));
        assert!(factory.is_current(&created));
        assert_eq!(previous.data_root(), old_dir.path());
    }

    #[test]
    fn replace_notifies_listeners_with_new_path() {
        let (_old, new, factory) = factory();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        factory.subscribe(Arc::new(move |event: &EngineReplaced| {
            sink.lock()
                .expect("lock")
                .push((event.new_path.clone(), event.reason));
        }));
        let created = factory.create(new.path()).expect("create");

        factory.replace(created);

        assert_eq!(
            *seen.lock().expect("lock"),
            vec![(new.path().to_path_buf(), ReplaceReason::Swap)]
        );
    }

    #[test]
    fn panicking_listener_does_not_undo_replacement() {
        let (_old, new, factory) = factory();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        factory.subscribe(Arc::new(|_: &EngineReplaced| panic!("listener exploded")));
        factory.subscribe(Arc::new(move |_: &EngineReplaced| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let created = factory.create(new.path()).expect("create");

        factory.replace(Arc::clone(&created));

        assert!(factory.is_current(&created));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn restore_puts_back_original_instance_and_documents() {
        let (old_dir, new, factory) = factory();
        let original = Arc::new(FileSaveEngine::open(old_dir.path()).expect("open"));
        original.open_document("a", "a.rtf").expect("open doc");
        original.edit(&"a".into(), "unsaved").expect("edit");
        let factory = SaveEngineFactory::new(original.clone(), Arc::new(FileSaveEngineBuilder));
        let state = factory.capture_state();
        factory.replace(factory.create(new.path()).expect("create"));
        original.edit(&"a".into(), "changed after capture").expect("edit");

        factory.restore_state(&state).expect("restore");

        let current = factory.current();
        assert_eq!(current.data_root(), old_dir.path());
        assert_eq!(original.content(&"a".into()), Some("unsaved".to_string()));
        assert_eq!(current.dirty_document_ids().len(), 1);
    }

    #[test]
    fn restore_into_disposed_engine_fails_and_keeps_current() {
        let (_old, new, factory) = factory();
        let state = factory.capture_state();
        let created = factory.create(new.path()).expect("create");
        factory.replace(Arc::clone(&created));
        state.engine().dispose();

        let result = factory.restore_state(&state);

        assert!(result.is_err());
        assert!(factory.is_current(&created));
    }

    #[test]
    fn concurrent_replacements_leave_one_whole_engine_active() {
        let (_old, _new, factory) = factory();
        let factory = Arc::new(factory);
        let dirs: Vec<TempDir> = (0..8).map(|_| tempfile::tempdir().expect("dir")).collect();
        let swaps = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|scope| {
            for dir in &dirs {
                let factory = Arc::clone(&factory);
                let swaps = Arc::clone(&swaps);
                scope.spawn(move || {
                    let engine = factory.create(dir.path()).expect("create");
                    factory.replace(engine);
                    swaps.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        let current = factory.current();
        assert_eq!(swaps.load(Ordering::SeqCst), dirs.len());
        assert!(dirs.iter().any(|d| d.path() == current.data_root()));
    }
}
