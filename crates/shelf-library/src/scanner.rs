//! Game executable scanning
//!
//! [`ExternalScanner`] is the boundary the sync loop talks to. [`FsScanner`]
//! is the filesystem implementation: it walks a root, collects executables
//! one directory at a time and records a modification-time fingerprint for
//! every directory so the next pass can skip directories that did not change.

use crate::path_key::PathKey;
use crate::records::{DirectoryFingerprint, GameRecord};
use shelf_config::ScannerSettings;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use thiserror::Error;
use walkdir::WalkDir;

/// Stems skipped regardless of the configured fragments
const BLOCKED_STEMS: &[&str] = &["update", "config", "settings"];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Incremental scan unavailable for {0}")]
    Unavailable(String),

    #[error("Library folder not found: {0}")]
    RootMissing(String),

    #[error("Scan task failed: {0}")]
    Task(String),
}

/// Games and directory fingerprints found under one root
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutput {
    pub games: Vec<GameRecord>,
    pub fingerprints: Vec<DirectoryFingerprint>,
}

/// Produces the current contents of a library root
pub trait ExternalScanner: Send + Sync {
    /// Fast pass reusing what is known about unchanged directories.
    /// Failing here means "fall back to a full scan".
    fn scan_incremental(
        &self,
        root: &str,
        cached_games: &[GameRecord],
        cached_fingerprints: &[DirectoryFingerprint],
    ) -> impl Future<Output = Result<ScanOutput, ScanError>> + Send;

    /// Authoritative re-walk of the whole root
    fn scan_full(&self, root: &str) -> impl Future<Output = Result<ScanOutput, ScanError>> + Send;
}

/// Filesystem scanner
#[derive(Debug, Clone)]
pub struct FsScanner {
    rules: Arc<ScanRules>,
}

impl Default for FsScanner {
    fn default() -> Self {
        Self::new(&ScannerSettings::default())
    }
}

impl FsScanner {
    pub fn new(settings: &ScannerSettings) -> Self {
        Self {
            rules: Arc::new(ScanRules::from_settings(settings)),
        }
    }
}

impl ExternalScanner for FsScanner {
    async fn scan_incremental(
        &self,
        root: &str,
        cached_games: &[GameRecord],
        cached_fingerprints: &[DirectoryFingerprint],
    ) -> Result<ScanOutput, ScanError> {
        if cached_fingerprints.is_empty() {
            return Err(ScanError::Unavailable(root.to_string()));
        }

        let rules = Arc::clone(&self.rules);
        let root = root.to_string();
        let games = cached_games.to_vec();
        let prints = cached_fingerprints.to_vec();
        tokio::task::spawn_blocking(move || rules.incremental(&root, games, &prints))
            .await
            .map_err(|e| ScanError::Task(e.to_string()))?
    }

    async fn scan_full(&self, root: &str) -> Result<ScanOutput, ScanError> {
        let rules = Arc::clone(&self.rules);
        let root = root.to_string();
        tokio::task::spawn_blocking(move || rules.full(&root))
            .await
            .map_err(|e| ScanError::Task(e.to_string()))?
    }
}

#[derive(Debug)]
struct ScanRules {
    extensions: HashSet<String>,
    min_size: u64,
    skip_dirs: HashSet<String>,
    blocked: Vec<String>,
    blocked_prefixes: Vec<String>,
    generic: HashSet<String>,
}

impl ScanRules {
    fn from_settings(settings: &ScannerSettings) -> Self {
        Self {
            extensions: settings
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            min_size: settings.min_file_size_kb * 1024,
            skip_dirs: lowercase(&settings.skip_dirs),
            blocked: lowercase(&settings.blocked_name_fragments),
            blocked_prefixes: lowercase(&settings.blocked_name_prefixes),
            generic: lowercase(&settings.generic_names),
        }
    }

    fn full(&self, root: &str) -> Result<ScanOutput, ScanError> {
        let root_path = Path::new(root);
        if !root_path.is_dir() {
            return Err(ScanError::RootMissing(root.to_string()));
        }

        let mut output = ScanOutput::default();
        for dir in self.directories(root_path) {
            output.fingerprints.push(fingerprint(&dir));
            output.games.extend(self.scan_dir(&dir));
        }
        finish(&mut output.games);

        tracing::debug!(
            "Full scan of {}: {} game(s) in {} dir(s)",
            root,
            output.games.len(),
            output.fingerprints.len()
        );
        Ok(output)
    }

    fn incremental(
        &self,
        root: &str,
        cached_games: Vec<GameRecord>,
        cached_fingerprints: &[DirectoryFingerprint],
    ) -> Result<ScanOutput, ScanError> {
        let root_path = Path::new(root);
        if !root_path.is_dir() {
            return Err(ScanError::RootMissing(root.to_string()));
        }

        let known: HashMap<PathKey, u64> = cached_fingerprints
            .iter()
            .map(|f| (PathKey::new(&f.dir_path), f.mtime))
            .collect();
        let mut by_dir: HashMap<PathKey, Vec<GameRecord>> = HashMap::new();
        for game in cached_games {
            by_dir
                .entry(PathKey::new(parent_of(&game.path)))
                .or_default()
                .push(game);
        }

        let mut output = ScanOutput::default();
        let mut rescanned = 0usize;
        for dir in self.directories(root_path) {
            let print = fingerprint(&dir);
            let key = PathKey::new(&print.dir_path);
            let unchanged = print.mtime != 0 && known.get(&key) == Some(&print.mtime);

            if unchanged {
                if let Some(cached) = by_dir.remove(&key) {
                    output.games.extend(cached);
                }
            } else {
                output.games.extend(self.scan_dir(&dir));
                rescanned += 1;
            }
            output.fingerprints.push(print);
        }
        finish(&mut output.games);

        tracing::debug!(
            "Incremental scan of {}: {} of {} dir(s) rescanned",
            root,
            rescanned,
            output.fingerprints.len()
        );
        Ok(output)
    }

    /// Every directory under `root`, the root included, minus skipped subtrees
    fn directories(&self, root: &Path) -> Vec<std::path::PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !self
                        .skip_dirs
                        .contains(&e.file_name().to_string_lossy().to_lowercase())
            })
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::debug!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .collect()
    }

    /// Executables directly inside `dir`
    fn scan_dir(&self, dir: &Path) -> Vec<GameRecord> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Cannot read {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut games = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(game) = self.create_game(dir, &path) {
                games.push(game);
            }
        }
        games
    }

    fn create_game(&self, dir: &Path, path: &Path) -> Option<GameRecord> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        if !self.extensions.contains(&ext) {
            return None;
        }
        let stem = path.file_stem()?.to_string_lossy().into_owned();
        if self.is_blocked(&stem) {
            return None;
        }
        if let Ok(meta) = path.metadata()
            && meta.len() < self.min_size
        {
            return None;
        }

        let name = if self.generic.contains(&stem.to_lowercase()) {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(stem)
        } else {
            stem
        };
        Some(GameRecord::new(name, path.to_string_lossy()))
    }

    fn is_blocked(&self, stem: &str) -> bool {
        let stem = stem.to_lowercase();
        BLOCKED_STEMS.contains(&stem.as_str())
            || self.blocked.iter().any(|frag| stem.contains(frag.as_str()))
            || self
                .blocked_prefixes
                .iter()
                .any(|prefix| stem.starts_with(prefix.as_str()))
    }
}

fn lowercase<C: FromIterator<String>>(values: &[String]) -> C {
    values.iter().map(|s| s.to_lowercase()).collect()
}

fn fingerprint(dir: &Path) -> DirectoryFingerprint {
    let mtime = dir
        .metadata()
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs());
    DirectoryFingerprint {
        dir_path: dir.to_string_lossy().into_owned(),
        mtime,
    }
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once(['/', '\\']).map_or("", |(parent, _)| parent)
}

/// Sort by path and drop repeated identities
fn finish(games: &mut Vec<GameRecord>) {
    games.sort_by(|a, b| a.path.cmp(&b.path));
    games.dedup_by(|a, b| a.key() == b.key());
}
