//! Library state aggregate
//!
//! [`LibraryState`] owns the game list, the folder registry, the scanner's
//! fingerprint cache and every table keyed by game path. Operations that
//! must keep those tables consistent (merge, migration, folder removal,
//! hard delete) all act on this one value.

use crate::LibraryError;
use crate::customization::Customization;
use crate::metadata::GameMetadata;
use crate::path_key::{PathKey, same_entity};
use crate::records::{
    Collection, DirectoryFingerprint, GameRecord, GameStats, LibraryFolder, Pointers, RecentGame,
    ScreenshotEntry, SessionEntry, VersionEntry, WishlistItem,
};
use crate::store::{BlobStore, StoreError, load_table, save_table};
use crate::tables::{PathMap, PathSet};
use std::collections::BTreeMap;

/// Persisted tables, one blob each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Games,
    Folders,
    Fingerprints,
    Stats,
    Metadata,
    Hidden,
    Favorites,
    Customizations,
    Notes,
    Collections,
    SessionLog,
    VersionHistory,
    CustomOrder,
    RecentGames,
    Screenshots,
    Wishlist,
    Pointers,
}

impl Table {
    pub const ALL: [Table; 17] = [
        Table::Games,
        Table::Folders,
        Table::Fingerprints,
        Table::Stats,
        Table::Metadata,
        Table::Hidden,
        Table::Favorites,
        Table::Customizations,
        Table::Notes,
        Table::Collections,
        Table::SessionLog,
        Table::VersionHistory,
        Table::CustomOrder,
        Table::RecentGames,
        Table::Screenshots,
        Table::Wishlist,
        Table::Pointers,
    ];

    /// Blob name in the store
    pub fn name(&self) -> &'static str {
        match self {
            Table::Games => "games",
            Table::Folders => "folders",
            Table::Fingerprints => "fingerprints",
            Table::Stats => "stats",
            Table::Metadata => "metadata",
            Table::Hidden => "hidden",
            Table::Favorites => "favorites",
            Table::Customizations => "customizations",
            Table::Notes => "notes",
            Table::Collections => "collections",
            Table::SessionLog => "session_log",
            Table::VersionHistory => "version_history",
            Table::CustomOrder => "custom_order",
            Table::RecentGames => "recent_games",
            Table::Screenshots => "screenshots",
            Table::Wishlist => "wishlist",
            Table::Pointers => "pointers",
        }
    }
}

/// Every per-game table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependentTables {
    pub stats: PathMap<GameStats>,
    pub metadata: PathMap<GameMetadata>,
    pub hidden: PathSet,
    pub favorites: PathSet,
    pub customizations: PathMap<Customization>,
    pub notes: PathMap<String>,
    pub collections: Vec<Collection>,
    pub session_log: PathMap<Vec<SessionEntry>>,
    pub version_history: PathMap<Vec<VersionEntry>>,
    /// View name -> ordered game paths
    pub custom_order: BTreeMap<String, Vec<String>>,
    /// Most recent first
    pub recent_games: Vec<RecentGame>,
    pub screenshots: PathMap<Vec<ScreenshotEntry>>,
    pub wishlist: Vec<WishlistItem>,
    pub pointers: Pointers,
}

impl DependentTables {
    /// Whether a game carries data that must survive its executable
    /// disappearing from disk.
    ///
    /// True when any of these hold: recorded playtime or launches, any
    /// linked catalog metadata record, a non-empty customization, a
    /// non-blank note, or the favorite flag.
    pub fn has_user_data(&self, key: &PathKey) -> bool {
        self.stats.get_key(key).is_some_and(GameStats::has_history)
            || self.metadata.contains_key(key)
            || self
                .customizations
                .get_key(key)
                .is_some_and(|c| !c.is_empty())
            || self
                .notes
                .get_key(key)
                .is_some_and(|n| !n.trim().is_empty())
            || self.favorites.contains_key(key)
    }

    /// Total number of entries across all path-keyed tables
    pub fn entry_count(&self) -> usize {
        self.stats.len()
            + self.metadata.len()
            + self.hidden.len()
            + self.favorites.len()
            + self.customizations.len()
            + self.notes.len()
            + self.collections.iter().map(|c| c.member_paths.len()).sum::<usize>()
            + self.session_log.len()
            + self.version_history.len()
            + self.custom_order.values().map(Vec::len).sum::<usize>()
            + self.recent_games.len()
            + self.screenshots.len()
    }

    /// Remove every trace of `path`. Returns the tables that changed.
    pub fn purge(&mut self, path: &str) -> Vec<Table> {
        let mut changed = Vec::new();

        if self.stats.remove(path).is_some() {
            changed.push(Table::Stats);
        }
        if self.metadata.remove(path).is_some() {
            changed.push(Table::Metadata);
        }
        if self.hidden.remove(path) {
            changed.push(Table::Hidden);
        }
        if self.favorites.remove(path) {
            changed.push(Table::Favorites);
        }
        if self.customizations.remove(path).is_some() {
            changed.push(Table::Customizations);
        }
        if self.notes.remove(path).is_some() {
            changed.push(Table::Notes);
        }
        let mut collections_changed = false;
        for collection in &mut self.collections {
            collections_changed |= collection.remove(path);
        }
        if collections_changed {
            changed.push(Table::Collections);
        }
        if self.session_log.remove(path).is_some() {
            changed.push(Table::SessionLog);
        }
        if self.version_history.remove(path).is_some() {
            changed.push(Table::VersionHistory);
        }
        let mut order_changed = false;
        for paths in self.custom_order.values_mut() {
            let before = paths.len();
            paths.retain(|p| !same_entity(p, path));
            order_changed |= paths.len() != before;
        }
        if order_changed {
            changed.push(Table::CustomOrder);
        }
        let before = self.recent_games.len();
        self.recent_games.retain(|r| !same_entity(&r.path, path));
        if self.recent_games.len() != before {
            changed.push(Table::RecentGames);
        }
        if self.screenshots.remove(path).is_some() {
            changed.push(Table::Screenshots);
        }
        let selected = self
            .pointers
            .selected
            .take_if(|p| same_entity(p.as_str(), path))
            .is_some();
        let running = self
            .pointers
            .running
            .take_if(|p| same_entity(p.as_str(), path))
            .is_some();
        if selected || running {
            changed.push(Table::Pointers);
        }

        changed
    }
}

/// The whole library
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryState {
    pub games: Vec<GameRecord>,
    pub folders: Vec<LibraryFolder>,
    /// Folder root -> directory fingerprints from its last scan
    pub fingerprints: PathMap<Vec<DirectoryFingerprint>>,
    pub tables: DependentTables,
}

impl LibraryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every table; missing tables start empty
    pub fn load(store: &dyn BlobStore) -> Result<Self, StoreError> {
        let t = DependentTables {
            stats: load_table(store, Table::Stats.name())?,
            metadata: load_table(store, Table::Metadata.name())?,
            hidden: load_table(store, Table::Hidden.name())?,
            favorites: load_table(store, Table::Favorites.name())?,
            customizations: load_table(store, Table::Customizations.name())?,
            notes: load_table(store, Table::Notes.name())?,
            collections: load_table(store, Table::Collections.name())?,
            session_log: load_table(store, Table::SessionLog.name())?,
            version_history: load_table(store, Table::VersionHistory.name())?,
            custom_order: load_table(store, Table::CustomOrder.name())?,
            recent_games: load_table(store, Table::RecentGames.name())?,
            screenshots: load_table(store, Table::Screenshots.name())?,
            wishlist: load_table(store, Table::Wishlist.name())?,
            pointers: load_table(store, Table::Pointers.name())?,
        };

        Ok(Self {
            games: load_table(store, Table::Games.name())?,
            folders: load_table(store, Table::Folders.name())?,
            fingerprints: load_table(store, Table::Fingerprints.name())?,
            tables: t,
        })
    }

    /// Write the named tables as whole snapshots
    pub fn save(&self, store: &dyn BlobStore, tables: &[Table]) -> Result<(), StoreError> {
        let t = &self.tables;
        for table in tables {
            let name = table.name();
            match table {
                Table::Games => save_table(store, name, &self.games)?,
                Table::Folders => save_table(store, name, &self.folders)?,
                Table::Fingerprints => save_table(store, name, &self.fingerprints)?,
                Table::Stats => save_table(store, name, &t.stats)?,
                Table::Metadata => save_table(store, name, &t.metadata)?,
                Table::Hidden => save_table(store, name, &t.hidden)?,
                Table::Favorites => save_table(store, name, &t.favorites)?,
                Table::Customizations => save_table(store, name, &t.customizations)?,
                Table::Notes => save_table(store, name, &t.notes)?,
                Table::Collections => save_table(store, name, &t.collections)?,
                Table::SessionLog => save_table(store, name, &t.session_log)?,
                Table::VersionHistory => save_table(store, name, &t.version_history)?,
                Table::CustomOrder => save_table(store, name, &t.custom_order)?,
                Table::RecentGames => save_table(store, name, &t.recent_games)?,
                Table::Screenshots => save_table(store, name, &t.screenshots)?,
                Table::Wishlist => save_table(store, name, &t.wishlist)?,
                Table::Pointers => save_table(store, name, &t.pointers)?,
            }
        }
        Ok(())
    }

    pub fn has_user_data(&self, key: &PathKey) -> bool {
        self.tables.has_user_data(key)
    }

    pub fn game(&self, path: &str) -> Option<&GameRecord> {
        let key = PathKey::new(path);
        self.games.iter().find(|g| g.key() == key)
    }

    fn game_mut(&mut self, path: &str) -> Option<&mut GameRecord> {
        let key = PathKey::new(path);
        self.games.iter_mut().find(|g| g.key() == key)
    }

    /// Name shown for a game: the user's override, else the scanned name
    pub fn display_name(&self, path: &str) -> Option<String> {
        let custom = self
            .tables
            .customizations
            .get(path)
            .and_then(|c| c.display_name.clone())
            .filter(|n| !n.trim().is_empty());
        custom.or_else(|| self.game(path).map(|g| g.name.clone()))
    }

    /// Games visible in the library view
    pub fn visible_games(&self) -> impl Iterator<Item = &GameRecord> {
        self.games
            .iter()
            .filter(|g| g.installed && !self.tables.hidden.contains(&g.path))
    }

    /// Soft delete or restore a game
    pub fn set_installed(&mut self, path: &str, installed: bool) -> Result<(), LibraryError> {
        let game = self
            .game_mut(path)
            .ok_or_else(|| LibraryError::GameNotFound(path.to_string()))?;
        game.installed = installed;
        Ok(())
    }

    /// Remove a game and purge it from every table.
    /// Returns the removed record and the dependent tables that changed.
    pub fn delete_game(&mut self, path: &str) -> Result<(GameRecord, Vec<Table>), LibraryError> {
        let key = PathKey::new(path);
        let idx = self
            .games
            .iter()
            .position(|g| g.key() == key)
            .ok_or_else(|| LibraryError::GameNotFound(path.to_string()))?;
        let removed = self.games.remove(idx);
        let changed = self.tables.purge(path);
        tracing::info!(
            "Deleted {} and purged {} table(s)",
            removed.path,
            changed.len()
        );
        Ok((removed, changed))
    }

    /// Log a finished play session
    pub fn record_session(
        &mut self,
        path: &str,
        started_at: u64,
        duration_secs: u64,
        recent_limit: usize,
    ) {
        let stats = self.tables.stats.get_or_insert_with(path, GameStats::default);
        stats.total_secs += duration_secs;
        stats.launch_count += 1;
        stats.last_played = Some(stats.last_played.map_or(started_at, |t| t.max(started_at)));

        self.tables
            .session_log
            .get_or_insert_with(path, Vec::new)
            .push(SessionEntry {
                path: path.to_string(),
                started_at,
                duration_secs,
            });

        let name = self
            .display_name(path)
            .unwrap_or_else(|| fallback_name(path));
        let entry = RecentGame {
            name,
            path: path.to_string(),
        };
        self.push_recent(entry, recent_limit);
    }

    fn push_recent(&mut self, entry: RecentGame, limit: usize) {
        let recent = &mut self.tables.recent_games;
        recent.retain(|r| !same_entity(&r.path, &entry.path));
        recent.insert(0, entry);
        recent.truncate(limit.max(1));
    }

    /// Replace linked metadata
    pub fn link_metadata(&mut self, path: &str, metadata: GameMetadata) {
        self.tables.metadata.insert(path, metadata);
    }

    /// Fill blank fields of existing metadata from a fresh fetch
    pub fn refresh_metadata(&mut self, path: &str, fetched: &GameMetadata) {
        match self.tables.metadata.get_mut(path) {
            Some(existing) => existing.merge(fetched),
            None => {
                self.tables.metadata.insert(path, fetched.clone());
            }
        }
    }

    pub fn unlink_metadata(&mut self, path: &str) -> bool {
        self.tables.metadata.remove(path).is_some()
    }

    /// Set or clear a note; a blank note removes the entry
    pub fn set_note(&mut self, path: &str, note: &str) {
        if note.trim().is_empty() {
            self.tables.notes.remove(path);
        } else {
            self.tables.notes.insert(path, note.to_string());
        }
    }

    /// Edit a game's customization, dropping the record once it is empty
    pub fn customize(&mut self, path: &str, edit: impl FnOnce(&mut Customization)) {
        let custom = self
            .tables
            .customizations
            .get_or_insert_with(path, Customization::default);
        edit(custom);
        if custom.is_empty() {
            self.tables.customizations.remove(path);
        }
    }

    pub fn set_hidden(&mut self, path: &str, hidden: bool) {
        self.tables.hidden.set(path, hidden);
    }

    pub fn set_favorite(&mut self, path: &str, favorite: bool) {
        self.tables.favorites.set(path, favorite);
    }

    pub fn record_version(&mut self, path: &str, entry: VersionEntry) {
        self.tables
            .version_history
            .get_or_insert_with(path, Vec::new)
            .push(entry);
    }

    pub fn add_screenshot(&mut self, path: &str, entry: ScreenshotEntry) {
        self.tables
            .screenshots
            .get_or_insert_with(path, Vec::new)
            .push(entry);
    }

    /// Store a view's manual ordering, dropping repeated paths
    pub fn set_custom_order(&mut self, view: &str, paths: Vec<String>) {
        let mut seen = std::collections::HashSet::new();
        let ordered: Vec<String> = paths
            .into_iter()
            .filter(|p| seen.insert(PathKey::new(p)))
            .collect();
        if ordered.is_empty() {
            self.tables.custom_order.remove(view);
        } else {
            self.tables.custom_order.insert(view.to_string(), ordered);
        }
    }

    /// Create a collection and return its id
    pub fn create_collection(&mut self, name: &str, color: &str) -> String {
        let next = self
            .tables
            .collections
            .iter()
            .filter_map(|c| c.id.strip_prefix("col-")?.parse::<u64>().ok())
            .max()
            .map_or(1, |n| n + 1);
        let id = format!("col-{}", next);
        self.tables
            .collections
            .push(Collection::new(id.clone(), name, color));
        id
    }

    fn collection_mut(&mut self, id: &str) -> Result<&mut Collection, LibraryError> {
        self.tables
            .collections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| LibraryError::CollectionNotFound(id.to_string()))
    }

    pub fn rename_collection(&mut self, id: &str, name: &str) -> Result<(), LibraryError> {
        self.collection_mut(id)?.name = name.to_string();
        Ok(())
    }

    pub fn delete_collection(&mut self, id: &str) -> Result<Collection, LibraryError> {
        let idx = self
            .tables
            .collections
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| LibraryError::CollectionNotFound(id.to_string()))?;
        Ok(self.tables.collections.remove(idx))
    }

    pub fn add_to_collection(&mut self, id: &str, path: &str) -> Result<bool, LibraryError> {
        Ok(self.collection_mut(id)?.add(path))
    }

    pub fn remove_from_collection(&mut self, id: &str, path: &str) -> Result<bool, LibraryError> {
        Ok(self.collection_mut(id)?.remove(path))
    }

    pub fn add_wishlist(&mut self, item: WishlistItem) {
        self.tables.wishlist.push(item);
    }

    pub fn remove_wishlist(&mut self, title: &str) -> bool {
        let before = self.tables.wishlist.len();
        self.tables.wishlist.retain(|w| w.title != title);
        self.tables.wishlist.len() != before
    }

    pub fn select(&mut self, path: Option<&str>) {
        self.tables.pointers.selected = path.map(str::to_string);
    }

    pub fn set_running(&mut self, path: Option<&str>) {
        self.tables.pointers.running = path.map(str::to_string);
    }
}

fn fallback_name(path: &str) -> String {
    path.rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or(path)
        .to_string()
}
