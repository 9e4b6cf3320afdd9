use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use notestore_core::{DocumentId, StorageMode, is_same_location};
use notestore_engine::{
    DocumentState, EngineError, SaveEngine, SaveEngineBuilder, SaveEngineFactory, SaveReport,
};
use notestore_saga::StateTransition;
use tempfile::TempDir;

use crate::Result;
use crate::error::OperationError;
use crate::operations::relocation::steps::RelocationPlan;
use crate::operations::{
    RelocationContext, StorageTransactionManager, TransactionListener, TransactionProgress,
    TransactionResult, TransactionStarted,
};
use crate::providers::InMemoryRootPath;
use crate::traits::{
    ConfigurationStore, DataMigrator, DiskSpaceProbe, FileWatcher, MigrationReport,
    StorageValidator, ValidationReport,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct MockSaveEngine {
    root: PathBuf,
    documents: Mutex<BTreeMap<DocumentId, DocumentState>>,
    failing: Mutex<BTreeSet<DocumentId>>,
    wal: Mutex<Vec<String>>,
    disposed: AtomicBool,
    fail_restore: AtomicBool,
}

impl MockSaveEngine {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            documents: Mutex::new(BTreeMap::new()),
            failing: Mutex::new(BTreeSet::new()),
            wal: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
            fail_restore: AtomicBool::new(false),
        }
    }

    /// Open `count` more documents named `doc-N`, each with unsaved edits.
    pub fn add_dirty(&self, count: usize) {
        let mut documents = lock(&self.documents);
        let start = documents.len();
        for n in start..start + count {
            let id = DocumentId::new(format!("doc-{n}"));
            documents.insert(
                id.clone(),
                DocumentState {
                    file_path: PathBuf::from(format!("{id}.rtf")),
                    current_content: format!("edited {id}"),
                    persisted_content: String::new(),
                    dirty: true,
                    id: id.clone(),
                },
            );
            lock(&self.wal).push(format!("{id}:wal"));
        }
    }

    pub fn fail_saving(&self, id: &str) {
        lock(&self.failing).insert(DocumentId::from(id));
    }

    pub fn fail_restore(&self) {
        self.fail_restore.store(true, Ordering::SeqCst);
    }

    pub fn clear_documents(&self) {
        lock(&self.documents).clear();
        lock(&self.wal).clear();
    }
}

impl SaveEngine for MockSaveEngine {
    fn data_root(&self) -> &Path {
        &self.root
    }

    fn dirty_document_ids(&self) -> Vec<DocumentId> {
        if self.is_disposed() {
            return Vec::new();
        }
        lock(&self.documents)
            .values()
            .filter(|d| d.dirty)
            .map(|d| d.id.clone())
            .collect()
    }

    fn save_all_dirty(&self) -> SaveReport {
        let failing = lock(&self.failing).clone();
        let mut report = SaveReport::default();
        for document in lock(&self.documents).values_mut().filter(|d| d.dirty) {
            if failing.contains(&document.id) {
                report.failed += 1;
                report.failed_ids.push(document.id.clone());
            } else {
                document.persisted_content = document.current_content.clone();
                document.dirty = false;
                report.saved += 1;
            }
        }
        report
    }

    fn documents(&self) -> Vec<DocumentState> {
        lock(&self.documents).values().cloned().collect()
    }

    fn pending_wal_entries(&self) -> Vec<String> {
        lock(&self.wal).clone()
    }

    fn restore_documents(
        &self,
        documents: &[DocumentState],
        wal_entries: &[String],
    ) -> notestore_engine::Result<()> {
        if self.fail_restore.load(Ordering::SeqCst) || self.is_disposed() {
            return Err(EngineError::Disposed(self.root.clone()));
        }
        *lock(&self.documents) = documents
            .iter()
            .map(|d| (d.id.clone(), d.clone()))
            .collect();
        *lock(&self.wal) = wal_entries.to_vec();
        Ok(())
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct MockEngineBuilder {
    fail_next: Mutex<Option<String>>,
    pub built: Mutex<Vec<Arc<MockSaveEngine>>>,
}

impl MockEngineBuilder {
    /// Make the next build fail with `reason`.
    pub fn fail_next(&self, reason: &str) {
        *lock(&self.fail_next) = Some(reason.to_string());
    }
}

impl SaveEngineBuilder for MockEngineBuilder {
    fn build(&self, root: &Path) -> notestore_engine::Result<Arc<dyn SaveEngine>> {
        if let Some(reason) = lock(&self.fail_next).take() {
            return Err(EngineError::Construction {
                path: root.to_path_buf(),
                reason,
            });
        }
        let engine = Arc::new(MockSaveEngine::new(root));
        lock(&self.built).push(Arc::clone(&engine));
        Ok(engine)
    }
}

#[derive(Debug, Clone)]
struct ConfigValues {
    default_path: Option<PathBuf>,
    metadata_path: Option<PathBuf>,
    mode: StorageMode,
    autosave_interval_secs: u64,
}

pub struct MockConfigurationStore {
    values: Mutex<ConfigValues>,
    persisted: Mutex<ConfigValues>,
    persist_count: AtomicUsize,
    successes_left: Mutex<Option<usize>>,
}

impl MockConfigurationStore {
    #[must_use]
    pub fn new(default_path: &Path) -> Self {
        let values = ConfigValues {
            default_path: Some(default_path.to_path_buf()),
            metadata_path: Some(crate::config::metadata_path_for(default_path)),
            mode: StorageMode::Local,
            autosave_interval_secs: crate::config::DEFAULT_AUTOSAVE_INTERVAL_SECS,
        };
        Self {
            persisted: Mutex::new(values.clone()),
            values: Mutex::new(values),
            persist_count: AtomicUsize::new(0),
            successes_left: Mutex::new(None),
        }
    }

    /// Let `successes` more persists succeed, then fail every one after.
    pub fn fail_persist_after(&self, successes: usize) {
        *lock(&self.successes_left) = Some(successes);
    }

    #[must_use]
    pub fn persist_count(&self) -> usize {
        self.persist_count.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn persisted_default_path(&self) -> Option<PathBuf> {
        lock(&self.persisted).default_path.clone()
    }
}

impl ConfigurationStore for MockConfigurationStore {
    fn default_path(&self) -> Option<PathBuf> {
        lock(&self.values).default_path.clone()
    }

    fn set_default_path(&self, path: Option<&Path>) {
        lock(&self.values).default_path = path.map(Path::to_path_buf);
    }

    fn metadata_path(&self) -> Option<PathBuf> {
        lock(&self.values).metadata_path.clone()
    }

    fn set_metadata_path(&self, path: Option<&Path>) {
        lock(&self.values).metadata_path = path.map(Path::to_path_buf);
    }

    fn storage_mode(&self) -> StorageMode {
        lock(&self.values).mode
    }

    fn set_storage_mode(&self, mode: StorageMode) {
        lock(&self.values).mode = mode;
    }

    fn autosave_interval_secs(&self) -> u64 {
        lock(&self.values).autosave_interval_secs
    }

    fn set_autosave_interval_secs(&self, secs: u64) {
        lock(&self.values).autosave_interval_secs = secs;
    }

    fn persist(&self) -> Result<()> {
        let mut successes_left = lock(&self.successes_left);
        match *successes_left {
            Some(0) => {
                return Err(OperationError::ConfigWrite {
                    path: PathBuf::from("/mock/notestore.toml"),
                    source: io::Error::other("simulated write failure"),
                });
            }
            Some(n) => *successes_left = Some(n - 1),
            None => {}
        }
        *lock(&self.persisted) = lock(&self.values).clone();
        self.persist_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockFileWatcher {
    watched: Mutex<Option<PathBuf>>,
    fail_on: Mutex<Option<PathBuf>>,
}

impl MockFileWatcher {
    #[must_use]
    pub fn new(watched: Option<PathBuf>) -> Self {
        Self {
            watched: Mutex::new(watched),
            fail_on: Mutex::new(None),
        }
    }

    pub fn fail_watching(&self, path: &Path) {
        *lock(&self.fail_on) = Some(path.to_path_buf());
    }
}

impl FileWatcher for MockFileWatcher {
    fn stop_all(&self) {
        *lock(&self.watched) = None;
    }

    fn start_watching(&self, path: &Path, _filter: &str, _recursive: bool) -> Result<()> {
        if lock(&self.fail_on).as_deref() == Some(path) {
            return Err(OperationError::Watch {
                path: path.to_path_buf(),
                source: notify::Error::generic("simulated watcher failure"),
            });
        }
        *lock(&self.watched) = Some(path.to_path_buf());
        Ok(())
    }

    fn watched_directory(&self) -> Option<PathBuf> {
        lock(&self.watched).clone()
    }
}

#[derive(Default)]
pub struct MockDataMigrator {
    pub copies: Mutex<Vec<(PathBuf, PathBuf)>>,
    pub undone: AtomicUsize,
    pub removed: Mutex<Vec<PathBuf>>,
    pub fail_copy: AtomicBool,
    pub fail_undo: AtomicBool,
    pub fail_remove: AtomicBool,
}

impl DataMigrator for MockDataMigrator {
    fn copy_tree(&self, from: &Path, to: &Path, report: &mut MigrationReport) -> Result<()> {
        lock(&self.copies).push((from.to_path_buf(), to.to_path_buf()));
        report.created_files.push(to.join("copied.rtf"));
        if self.fail_copy.load(Ordering::SeqCst) {
            return Err(OperationError::MigrationCopy {
                path: from.join("unreadable.rtf"),
                source: io::Error::other("simulated copy failure"),
            });
        }
        Ok(())
    }

    fn undo(&self, report: &MigrationReport) -> Result<()> {
        self.undone.fetch_add(1, Ordering::SeqCst);
        if self.fail_undo.load(Ordering::SeqCst) {
            return Err(OperationError::MigrationRemove {
                path: report.created_files.first().cloned().unwrap_or_default(),
                source: io::Error::other("simulated undo failure"),
            });
        }
        Ok(())
    }

    fn remove_tree(&self, root: &Path) -> Result<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(OperationError::MigrationRemove {
                path: root.to_path_buf(),
                source: io::Error::other("simulated removal failure"),
            });
        }
        lock(&self.removed).push(root.to_path_buf());
        Ok(())
    }
}

pub struct MockDiskSpace {
    available: AtomicU64,
}

impl MockDiskSpace {
    pub fn set_available(&self, bytes: u64) {
        self.available.store(bytes, Ordering::SeqCst);
    }
}

impl Default for MockDiskSpace {
    fn default() -> Self {
        Self {
            available: AtomicU64::new(10 * 1024 * 1024 * 1024),
        }
    }
}

impl DiskSpaceProbe for MockDiskSpace {
    fn available_bytes(&self, _path: &Path) -> Result<u64> {
        Ok(self.available.load(Ordering::SeqCst))
    }
}

pub struct MockValidator {
    errors: Vec<String>,
    pub calls: AtomicUsize,
}

impl MockValidator {
    #[must_use]
    pub fn rejecting(message: &str) -> Self {
        Self {
            errors: vec![message.to_string()],
            calls: AtomicUsize::new(0),
        }
    }
}

impl StorageValidator for MockValidator {
    fn validate(&self, _path: &Path, _mode: StorageMode) -> ValidationReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ValidationReport {
            errors: self.errors.clone(),
            warnings: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct RecordingListener {
    pub started: AtomicUsize,
    pub completed: AtomicUsize,
    transitions: Mutex<Vec<StateTransition>>,
    percents: Mutex<Vec<f64>>,
}

impl RecordingListener {
    #[must_use]
    pub fn transitions(&self) -> Vec<StateTransition> {
        lock(&self.transitions).clone()
    }

    #[must_use]
    pub fn last_percent(&self) -> Option<f64> {
        lock(&self.percents).last().copied()
    }
}

impl TransactionListener for RecordingListener {
    fn on_started(&self, _event: &TransactionStarted) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_progress(&self, progress: &TransactionProgress) {
        lock(&self.percents).push(progress.percent_complete);
    }

    fn on_step_transition(&self, transition: &StateTransition) {
        lock(&self.transitions).push(transition.clone());
    }

    fn on_completed(&self, _result: &TransactionResult) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// A relocation environment: an old root with an active mock engine, an
/// empty parent directory for new roots, and mock collaborators.
pub struct TestRig {
    old_dir: TempDir,
    new_dir: TempDir,
    old_engine: Arc<MockSaveEngine>,
    pub factory: Arc<SaveEngineFactory>,
    pub builder: Arc<MockEngineBuilder>,
    pub configuration: Arc<MockConfigurationStore>,
    pub watcher: Arc<MockFileWatcher>,
    pub root_path: Arc<InMemoryRootPath>,
    pub migrator: Arc<MockDataMigrator>,
    pub disk_space: Arc<MockDiskSpace>,
}

impl TestRig {
    /// # Panics
    ///
    /// Panics if the temporary directories cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let old_dir = tempfile::tempdir().expect("old root");
        let new_dir = tempfile::tempdir().expect("new parent");
        let old_path = old_dir.path().to_path_buf();
        let old_engine = Arc::new(MockSaveEngine::new(&old_path));
        let builder = Arc::new(MockEngineBuilder::default());
        let factory = Arc::new(SaveEngineFactory::new(
            Arc::clone(&old_engine) as Arc<dyn SaveEngine>,
            Arc::clone(&builder) as Arc<dyn SaveEngineBuilder>,
        ));
        Self {
            configuration: Arc::new(MockConfigurationStore::new(&old_path)),
            watcher: Arc::new(MockFileWatcher::new(Some(old_path.clone()))),
            root_path: Arc::new(InMemoryRootPath::new(old_path)),
            migrator: Arc::new(MockDataMigrator::default()),
            disk_space: Arc::new(MockDiskSpace::default()),
            old_dir,
            new_dir,
            old_engine,
            factory,
            builder,
        }
    }

    #[must_use]
    pub fn old_path(&self) -> PathBuf {
        self.old_dir.path().to_path_buf()
    }

    /// Existing, empty directory new roots are placed in.
    #[must_use]
    pub fn new_parent(&self) -> &Path {
        self.new_dir.path()
    }

    /// A new root that does not exist yet.
    #[must_use]
    pub fn new_path(&self) -> PathBuf {
        self.new_dir.path().join("notes")
    }

    /// The engine that was active when the rig was built.
    #[must_use]
    pub fn old_engine(&self) -> Arc<MockSaveEngine> {
        Arc::clone(&self.old_engine)
    }

    #[must_use]
    pub fn context(&self) -> RelocationContext {
        RelocationContext::new(
            Arc::clone(&self.factory),
            Arc::clone(&self.configuration) as Arc<dyn ConfigurationStore>,
            Arc::clone(&self.watcher) as Arc<dyn FileWatcher>,
            Arc::clone(&self.root_path) as Arc<dyn crate::traits::RootPathRegistry>,
        )
        .with_migrator(Arc::clone(&self.migrator) as Arc<dyn DataMigrator>)
        .with_disk_space(Arc::clone(&self.disk_space) as Arc<dyn DiskSpaceProbe>)
    }

    #[must_use]
    pub fn manager(&self) -> StorageTransactionManager {
        StorageTransactionManager::new(self.context())
    }

    pub(crate) fn plan(&self, new_path: &Path) -> RelocationPlan {
        self.plan_with_mode(new_path, StorageMode::Local)
    }

    pub(crate) fn plan_with_mode(&self, new_path: &Path, mode: StorageMode) -> RelocationPlan {
        let old_path = self.old_path();
        RelocationPlan {
            same_location: is_same_location(&old_path, new_path),
            old_path,
            new_path: new_path.to_path_buf(),
            mode,
            keep_original_data: true,
        }
    }
}

impl Default for TestRig {
    fn default() -> Self {
        Self::new()
    }
}
