//! Library records

use crate::path_key::{PathKey, same_entity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A game in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Display name as found by the scanner
    pub name: String,
    /// Executable path, in its original spelling
    pub path: String,
    /// False once the executable vanished from disk (soft delete)
    #[serde(default = "default_installed")]
    pub installed: bool,
}

fn default_installed() -> bool {
    true
}

impl GameRecord {
    /// A freshly discovered, installed game
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            installed: true,
        }
    }

    pub fn key(&self) -> PathKey {
        PathKey::new(&self.path)
    }
}

/// A registered library root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryFolder {
    pub root_path: String,
}

impl LibraryFolder {
    pub fn new(root_path: impl Into<String>) -> Self {
        Self {
            root_path: root_path.into(),
        }
    }

    /// True if `path` belongs to this folder
    pub fn owns(&self, path: &str) -> bool {
        crate::path_key::is_under(path, &self.root_path)
    }
}

/// Directory modification time remembered by the incremental scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryFingerprint {
    pub dir_path: String,
    /// Seconds since the Unix epoch, 0 when unknown
    pub mtime: u64,
}

/// Playtime statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    #[serde(default)]
    pub total_secs: u64,
    #[serde(default)]
    pub launch_count: u32,
    /// Unix seconds of the last session start
    #[serde(default)]
    pub last_played: Option<u64>,
}

impl GameStats {
    pub fn has_history(&self) -> bool {
        self.total_secs > 0 || self.launch_count > 0
    }
}

/// One play session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub path: String,
    pub started_at: u64,
    pub duration_secs: u64,
}

/// A version of a game the user recorded (e.g. before applying an update)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    pub recorded_at: u64,
    #[serde(default)]
    pub note: Option<String>,
}

/// Screenshot captured for a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotEntry {
    pub file: String,
    pub taken_at: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Entry in the recently-launched list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentGame {
    pub name: String,
    pub path: String,
}

/// Game the user wants but does not own; not tied to any path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    pub added_at: u64,
}

/// User-defined group of games
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub member_paths: BTreeSet<String>,
}

impl Collection {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            member_paths: BTreeSet::new(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.member_paths.iter().any(|m| same_entity(m, path))
    }

    /// Returns true if the path was added
    pub fn add(&mut self, path: &str) -> bool {
        if self.contains(path) {
            return false;
        }
        self.member_paths.insert(path.to_string())
    }

    /// Returns true if a member was removed
    pub fn remove(&mut self, path: &str) -> bool {
        let before = self.member_paths.len();
        self.member_paths.retain(|m| !same_entity(m, path));
        self.member_paths.len() != before
    }
}

/// "Currently selected" and "currently running" game pointers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointers {
    #[serde(default)]
    pub selected: Option<String>,
    #[serde(default)]
    pub running: Option<String>,
}

/// Remove later duplicates by path identity, keeping the first occurrence
pub fn dedup_games(games: Vec<GameRecord>) -> Vec<GameRecord> {
    let mut seen = BTreeSet::new();
    games
        .into_iter()
        .filter(|g| seen.insert(g.key()))
        .collect()
}
