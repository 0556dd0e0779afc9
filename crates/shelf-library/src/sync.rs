//! Sync coordination
//!
//! [`SyncCoordinator`] owns the library state and serializes the operations
//! that restructure it. At most one sync, rescan, folder change or
//! migration runs at a time; a second request is rejected with
//! [`LibraryError::AlreadySyncing`] rather than queued. Roots are processed
//! one after another in registration order, and the coordinator yields to
//! the runtime after each root so the application stays responsive.
//!
//! The state lock is never held across an await: each root's cached data
//! is copied out before scanning and the merge runs against the state as it
//! is when the scan returns, so user edits made meanwhile are respected.

use crate::LibraryError;
use crate::folders;
use crate::path_key::PathKey;
use crate::reconcile;
use crate::records::{GameRecord, LibraryFolder};
use crate::remap::{self, MigrationReport, PathRemap};
use crate::scanner::{ExternalScanner, ScanOutput};
use crate::state::{LibraryState, Table};
use crate::store::BlobStore;
use shelf_config::ShelfConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Tunables taken from configuration
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Try the incremental scan before the full one
    pub incremental: bool,
    /// Length of the recently-launched list
    pub recent_limit: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            incremental: true,
            recent_limit: 5,
        }
    }
}

impl From<&ShelfConfig> for SyncOptions {
    fn from(config: &ShelfConfig) -> Self {
        Self {
            incremental: config.sync.incremental,
            recent_limit: config.library.recent_limit,
        }
    }
}

/// Summary of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Roots whose scan was merged
    pub roots: usize,
    pub added: usize,
    pub soft_deleted: usize,
    pub dropped: usize,
    /// Roots where the incremental scan was unavailable
    pub fallbacks: usize,
    /// Roots left as they were because no scan succeeded
    pub failed_roots: Vec<String>,
}

/// Clears the busy flag when dropped
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owner of the library state
pub struct SyncCoordinator<S> {
    scanner: S,
    store: Arc<dyn BlobStore>,
    state: Mutex<LibraryState>,
    busy: AtomicBool,
    options: SyncOptions,
}

impl<S: ExternalScanner> SyncCoordinator<S> {
    /// Load the library from `store`
    pub fn open(
        scanner: S,
        store: Arc<dyn BlobStore>,
        options: SyncOptions,
    ) -> Result<Self, LibraryError> {
        let state = LibraryState::load(store.as_ref())?;
        tracing::info!(
            "Loaded library: {} game(s) in {} folder(s)",
            state.games.len(),
            state.folders.len()
        );
        Ok(Self::with_state(scanner, store, state, options))
    }

    pub fn with_state(
        scanner: S,
        store: Arc<dyn BlobStore>,
        state: LibraryState,
        options: SyncOptions,
    ) -> Self {
        Self {
            scanner,
            store,
            state: Mutex::new(state),
            busy: AtomicBool::new(false),
            options,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LibraryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> Result<BusyGuard<'_>, LibraryError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LibraryError::AlreadySyncing)?;
        Ok(BusyGuard(&self.busy))
    }

    pub fn scanner(&self) -> &S {
        &self.scanner
    }

    pub fn is_syncing(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Write tables; failures are logged, never surfaced
    fn persist(&self, state: &LibraryState, tables: &[Table]) {
        if let Err(e) = state.save(self.store.as_ref(), tables) {
            tracing::warn!("Failed to persist library tables: {}", e);
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> LibraryState {
        self.lock().clone()
    }

    pub fn list_folders(&self) -> Vec<LibraryFolder> {
        folders::list_folders(&self.lock()).to_vec()
    }

    /// Re-scan every registered root, incrementally when enabled
    pub async fn sync(&self) -> Result<SyncReport, LibraryError> {
        let _busy = self.begin()?;
        let roots = self.roots();
        Ok(self.run(roots, self.options.incremental).await)
    }

    /// Full re-walk of every registered root
    pub async fn rescan_all(&self) -> Result<SyncReport, LibraryError> {
        let _busy = self.begin()?;
        let roots = self.roots();
        Ok(self.run(roots, false).await)
    }

    /// Register a root and run a full scan of it
    pub async fn add_folder(&self, root: &str) -> Result<SyncReport, LibraryError> {
        let _busy = self.begin()?;
        let folder = {
            let mut state = self.lock();
            let folder = folders::add_folder(&mut state, root)?;
            self.persist(&state, &[Table::Folders]);
            folder
        };
        Ok(self.run(vec![folder.root_path], false).await)
    }

    /// Unregister a root and drop its games
    pub fn remove_folder(&self, root: &str) -> Result<Vec<GameRecord>, LibraryError> {
        let _busy = self.begin()?;
        let mut state = self.lock();
        let removed = folders::remove_folder(&mut state, root)?;
        self.persist(&state, &[Table::Folders, Table::Games, Table::Fingerprints]);
        Ok(removed)
    }

    /// Move a library root, rewriting every stored path beneath it
    pub fn migrate(&self, old_root: &str, new_root: &str) -> Result<MigrationReport, LibraryError> {
        let remap = PathRemap::new(old_root, new_root)?;
        let _busy = self.begin()?;
        let mut state = self.lock();
        let report = remap::apply(&mut state, &remap);
        self.persist(&state, &Table::ALL);
        Ok(report)
    }

    /// Apply a user edit and persist the named tables
    pub fn update<R>(
        &self,
        tables: &[Table],
        edit: impl FnOnce(&mut LibraryState) -> Result<R, LibraryError>,
    ) -> Result<R, LibraryError> {
        let mut state = self.lock();
        let result = edit(&mut state)?;
        self.persist(&state, tables);
        Ok(result)
    }

    /// Remove a game and everything recorded about it
    pub fn delete_game(&self, path: &str) -> Result<GameRecord, LibraryError> {
        let mut state = self.lock();
        let (removed, mut changed) = state.delete_game(path)?;
        changed.push(Table::Games);
        self.persist(&state, &changed);
        Ok(removed)
    }

    pub fn set_installed(&self, path: &str, installed: bool) -> Result<(), LibraryError> {
        self.update(&[Table::Games], |state| state.set_installed(path, installed))
    }

    /// Log a finished play session
    pub fn record_session(&self, path: &str, started_at: u64, duration_secs: u64) {
        let limit = self.options.recent_limit;
        let tables = [Table::Stats, Table::SessionLog, Table::RecentGames];
        let mut state = self.lock();
        state.record_session(path, started_at, duration_secs, limit);
        self.persist(&state, &tables);
    }

    fn roots(&self) -> Vec<String> {
        self.lock()
            .folders
            .iter()
            .map(|f| f.root_path.clone())
            .collect()
    }

    async fn run(&self, roots: Vec<String>, incremental: bool) -> SyncReport {
        let mut report = SyncReport::default();

        for root in roots {
            tracing::info!("Scanning {}", root);
            let Some(output) = self.scan_root(&root, incremental, &mut report).await else {
                tracing::warn!("Scan of {} failed, keeping its previous contents", root);
                report.failed_roots.push(root);
                continue;
            };

            {
                let mut state = self.lock();
                let outcome = reconcile::merge(&state.games, output.games, &root, |key| {
                    state.has_user_data(key)
                });
                tracing::info!(
                    "Merged {}: {} kept, {} added, {} soft-deleted, {} dropped",
                    root,
                    outcome.kept,
                    outcome.added,
                    outcome.soft_deleted,
                    outcome.dropped
                );
                report.roots += 1;
                report.added += outcome.added;
                report.soft_deleted += outcome.soft_deleted;
                report.dropped += outcome.dropped;

                state.games = outcome.games;
                state.fingerprints.insert(root, output.fingerprints);
                self.persist(&state, &[Table::Games, Table::Fingerprints]);
            }

            tokio::task::yield_now().await;
        }

        report
    }

    async fn scan_root(
        &self,
        root: &str,
        incremental: bool,
        report: &mut SyncReport,
    ) -> Option<ScanOutput> {
        if incremental {
            let (games, prints) = {
                let state = self.lock();
                let key = PathKey::new(root);
                let games: Vec<GameRecord> = state
                    .games
                    .iter()
                    .filter(|g| g.installed && g.key().is_under(&key))
                    .cloned()
                    .collect();
                let prints = state.fingerprints.get(root).cloned().unwrap_or_default();
                (games, prints)
            };

            match self.scanner.scan_incremental(root, &games, &prints).await {
                Ok(output) => return Some(output),
                Err(e) => {
                    tracing::info!("Incremental scan of {} unavailable, falling back: {}", root, e);
                    report.fallbacks += 1;
                }
            }
        }

        match self.scanner.scan_full(root).await {
            Ok(output) => Some(output),
            Err(e) => {
                tracing::warn!("Full scan of {} failed: {}", root, e);
                None
            }
        }
    }
}
