//! Game library reconciliation for Shelf
//!
//! Keeps a personal game library consistent with what is on disk: fresh
//! scans are merged per library folder without losing user data, folder
//! migrations rewrite every stored path, and removing a folder cascades to
//! its games. All per-game tables are keyed by normalized path identity.

mod customization;
pub mod folders;
mod metadata;
mod path_key;
mod records;
pub mod reconcile;
pub mod remap;
mod scanner;
mod state;
mod store;
mod sync;
mod tables;

pub use customization::{Customization, PinnedExecutable};
pub use metadata::{GameMetadata, MetadataSource};
pub use path_key::{PathKey, is_under, normalize, same_entity, strip_root};
pub use reconcile::MergeOutcome;
pub use records::{
    Collection, DirectoryFingerprint, GameRecord, GameStats, LibraryFolder, Pointers, RecentGame,
    ScreenshotEntry, SessionEntry, VersionEntry, WishlistItem, dedup_games,
};
pub use remap::{MigrationIssue, MigrationReport, PathRemap};
pub use scanner::{ExternalScanner, FsScanner, ScanError, ScanOutput};
pub use state::{DependentTables, LibraryState, Table};
pub use store::{BlobStore, MemoryStore, SqliteStore, StoreError};
pub use sync::{SyncCoordinator, SyncOptions, SyncReport};
pub use tables::{PathMap, PathSet, Rekeyed};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Already syncing")]
    AlreadySyncing,

    #[error("Invalid migration: {0}")]
    InvalidMigration(MigrationIssue),

    #[error("Folder path is empty")]
    EmptyFolderPath,

    #[error("Folder already registered: {0}")]
    FolderAlreadyRegistered(String),

    #[error("Folder not registered: {0}")]
    FolderNotRegistered(String),

    #[error("Game not found: {0}")]
    GameNotFound(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<MigrationIssue> for LibraryError {
    fn from(issue: MigrationIssue) -> Self {
        LibraryError::InvalidMigration(issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(LibraryError::AlreadySyncing.to_string(), "Already syncing");
        assert_eq!(
            LibraryError::from(MigrationIssue::IdenticalRoots).to_string(),
            "Invalid migration: paths identical"
        );
    }
}
