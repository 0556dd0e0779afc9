//! Folder migration
//!
//! When a library root moves on disk (`D:\Games\Old` -> `E:\NewGames`), every
//! stored path beneath it is rewritten in place: games, every per-game
//! table, collection members, session entries, orderings, folder registry,
//! scanner fingerprints, recent list, path-valued customization fields and
//! the selected/running pointers. Only the matched root prefix is replaced;
//! the remainder of each path keeps its original spelling. The output uses
//! the separator style of the new root.

use crate::path_key::{PathKey, strip_root};
use crate::records::dedup_games;
use crate::state::LibraryState;
use crate::tables::Rekeyed;
use std::collections::HashSet;
use std::fmt;

/// Why a migration request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationIssue {
    /// One of the roots normalizes to nothing
    EmptyRoot,
    /// Both roots name the same folder
    IdenticalRoots,
}

impl fmt::Display for MigrationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationIssue::EmptyRoot => f.write_str("folder path is empty"),
            MigrationIssue::IdenticalRoots => f.write_str("paths identical"),
        }
    }
}

/// Counts from an applied migration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Games whose path identity changed
    pub moved_games: usize,
    /// Entries rewritten across all other tables
    pub rewritten_entries: usize,
    /// Registered folders that moved
    pub moved_folders: usize,
    /// Per-game table entries lost because two roots collapsed onto one path
    pub dropped_entries: usize,
}

/// A validated old-root -> new-root rewrite
#[derive(Debug, Clone)]
pub struct PathRemap {
    old_root: PathKey,
    new_root: String,
    backslashes: bool,
}

impl PathRemap {
    /// Validate a pair of roots
    pub fn new(old_root: &str, new_root: &str) -> Result<Self, MigrationIssue> {
        let old_key = PathKey::new(old_root);
        let new_key = PathKey::new(new_root);
        if old_key.is_empty() || new_key.is_empty() {
            return Err(MigrationIssue::EmptyRoot);
        }
        if old_key == new_key {
            return Err(MigrationIssue::IdenticalRoots);
        }

        Ok(Self {
            old_root: old_key,
            new_root: new_root.trim_end_matches(['/', '\\']).to_string(),
            backslashes: new_root.contains('\\') && !new_root.contains('/'),
        })
    }

    /// New spelling of `path`, or `None` if it is not under the old root
    pub fn rewrite(&self, path: &str) -> Option<String> {
        let suffix = strip_root(path, &self.old_root)?;
        let joined = format!("{}{}", self.new_root, suffix);
        Some(if self.backslashes {
            joined.replace('/', "\\")
        } else {
            joined.replace('\\', "/")
        })
    }

    /// `rewrite(path)`, or the path unchanged
    pub fn rewrite_or_keep(&self, path: &str) -> String {
        self.rewrite(path).unwrap_or_else(|| path.to_string())
    }

    fn rewrite_in_place(&self, path: &mut String) -> bool {
        match self.rewrite(path) {
            Some(new) if new != *path => {
                *path = new;
                true
            }
            _ => false,
        }
    }
}

/// Apply `remap` to every table of `state`.
pub fn apply(state: &mut LibraryState, remap: &PathRemap) -> MigrationReport {
    let mut report = MigrationReport::default();
    let rewrite = |p: &str| remap.rewrite(p);

    // Keys whose surviving game is one that moved; table entries follow it.
    let mut seen = HashSet::new();
    let mut moved_winners = HashSet::new();
    for game in &mut state.games {
        let before = game.key();
        remap.rewrite_in_place(&mut game.path);
        let after = game.key();
        let moved = after != before;
        if moved {
            report.moved_games += 1;
        }
        if seen.insert(after.clone()) && moved {
            moved_winners.insert(after);
        }
    }
    state.games = dedup_games(std::mem::take(&mut state.games));

    for folder in &mut state.folders {
        if remap.rewrite_in_place(&mut folder.root_path) {
            report.moved_folders += 1;
        }
    }
    let mut seen = HashSet::new();
    state
        .folders
        .retain(|f| seen.insert(PathKey::new(&f.root_path)));

    state.fingerprints.rekey(rewrite);
    state.fingerprints.retain(|_, prints| {
        for print in prints.iter_mut() {
            remap.rewrite_in_place(&mut print.dir_path);
        }
        true
    });

    let t = &mut state.tables;
    let wins = |key: &PathKey| moved_winners.contains(key);
    let mut n = 0;
    let mut dropped = 0;
    let mut tally = |outcome: Rekeyed| {
        n += outcome.moved;
        dropped += outcome.dropped;
    };
    tally(t.stats.rekey_preferring(rewrite, wins));
    tally(t.metadata.rekey_preferring(rewrite, wins));
    tally(t.customizations.rekey_preferring(rewrite, wins));
    tally(t.notes.rekey_preferring(rewrite, wins));
    tally(t.session_log.rekey_preferring(rewrite, wins));
    tally(t.version_history.rekey_preferring(rewrite, wins));
    tally(t.screenshots.rekey_preferring(rewrite, wins));
    report.dropped_entries = dropped;
    n += t.hidden.rekey(rewrite);
    n += t.favorites.rekey(rewrite);

    t.customizations.retain(|_, custom| {
        n += custom.rewrite_paths(&rewrite);
        true
    });
    t.session_log.retain(|_, entries| {
        for entry in entries.iter_mut() {
            if remap.rewrite_in_place(&mut entry.path) {
                n += 1;
            }
        }
        true
    });

    for collection in &mut t.collections {
        let members = std::mem::take(&mut collection.member_paths);
        for member in members {
            let new = remap.rewrite_or_keep(&member);
            if new != member {
                n += 1;
            }
            if !collection.contains(&new) {
                collection.member_paths.insert(new);
            }
        }
    }

    for paths in t.custom_order.values_mut() {
        let mut seen = HashSet::new();
        let rewritten: Vec<String> = paths
            .drain(..)
            .map(|p| {
                let new = remap.rewrite_or_keep(&p);
                if new != p {
                    n += 1;
                }
                new
            })
            .filter(|p| seen.insert(PathKey::new(p)))
            .collect();
        *paths = rewritten;
    }

    for recent in &mut t.recent_games {
        if remap.rewrite_in_place(&mut recent.path) {
            n += 1;
        }
    }
    let mut seen = HashSet::new();
    t.recent_games.retain(|r| seen.insert(PathKey::new(&r.path)));

    for pointer in [&mut t.pointers.selected, &mut t.pointers.running] {
        if let Some(path) = pointer.as_mut()
            && remap.rewrite_in_place(path)
        {
            n += 1;
        }
    }

    report.rewritten_entries = n;
    if report.dropped_entries > 0 {
        tracing::warn!(
            "Migration dropped {} table entr(ies) on colliding paths",
            report.dropped_entries
        );
    }
    tracing::info!(
        "Migrated {} -> {}: {} game(s), {} folder(s), {} table entr(ies)",
        remap.old_root,
        remap.new_root,
        report.moved_games,
        report.moved_folders,
        report.rewritten_entries
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{GameMetadata, MetadataSource};
    use crate::path_key::is_under;
    use crate::customization::PinnedExecutable;
    use crate::records::{
        DirectoryFingerprint, GameRecord, GameStats, LibraryFolder, ScreenshotEntry, VersionEntry,
    };

    const OLD: &str = r"D:\Games\Old";
    const NEW: &str = r"E:\NewGames";
    const GAME: &str = r"D:\Games\Old\VN1\game.exe";
    const MOVED: &str = r"E:\NewGames\VN1\game.exe";

    #[test]
    fn test_rewrite_scenario() {
        let remap = PathRemap::new(OLD, NEW).unwrap();
        assert_eq!(remap.rewrite(GAME).as_deref(), Some(MOVED));
        assert_eq!(remap.rewrite(r"D:\Games\Older\x.exe"), None);
        assert_eq!(remap.rewrite(r"d:/games/old").as_deref(), Some(r"E:\NewGames"));
    }

    #[test]
    fn test_rewrite_preserves_suffix_case() {
        let remap = PathRemap::new("d:/games/old", "/mnt/games/").unwrap();
        assert_eq!(
            remap.rewrite(r"D:\GAMES\OLD\My VN\Game.EXE").as_deref(),
            Some("/mnt/games/My VN/Game.EXE")
        );
    }

    #[test]
    fn test_rewrite_output_separator_follows_new_root() {
        let remap = PathRemap::new("/home/u/games", r"G:\Library").unwrap();
        assert_eq!(
            remap.rewrite("/home/u/games/a/b.exe").as_deref(),
            Some(r"G:\Library\a\b.exe")
        );

        let mixed = PathRemap::new("/home/u/games", r"G:\Library/x").unwrap();
        assert_eq!(
            mixed.rewrite("/home/u/games/a.exe").as_deref(),
            Some("G:/Library/x/a.exe")
        );
    }

    #[test]
    fn test_invalid_roots() {
        assert_eq!(PathRemap::new("", "X").unwrap_err(), MigrationIssue::EmptyRoot);
        assert_eq!(PathRemap::new("X", "").unwrap_err(), MigrationIssue::EmptyRoot);
        assert_eq!(PathRemap::new("/", "X").unwrap_err(), MigrationIssue::EmptyRoot);
        assert_eq!(
            PathRemap::new("C:/Games", r"c:\GAMES\").unwrap_err(),
            MigrationIssue::IdenticalRoots
        );
    }

    fn populated_state() -> LibraryState {
        let mut state = LibraryState::new();
        state.folders.push(LibraryFolder::new(OLD));
        state.folders.push(LibraryFolder::new("C:/Keep"));
        state.games.push(GameRecord::new("VN1", GAME));
        state.games.push(GameRecord::new("Kept", "C:/Keep/k.exe"));
        state.fingerprints.insert(
            OLD,
            vec![DirectoryFingerprint {
                dir_path: r"D:\Games\Old\VN1".to_string(),
                mtime: 42,
            }],
        );
        state.record_session(GAME, 10, 360_000, 5);
        state.link_metadata(GAME, {
            let mut m = GameMetadata::new(MetadataSource::F95zone);
            m.title = Some("VN One".to_string());
            m
        });
        state.set_favorite(GAME, true);
        state.set_note(GAME, "route B next");
        state.set_hidden(GAME, true);
        state.record_version(GAME, VersionEntry {
            version: "0.9".to_string(),
            recorded_at: 7,
            note: None,
        });
        state.add_screenshot(GAME, ScreenshotEntry {
            file: "title.png".to_string(),
            taken_at: 8,
            tags: Vec::new(),
        });
        state.customize(GAME, |c| {
            c.exe_override = Some(r"D:\Games\Old\VN1\alt.exe".to_string());
            c.pinned_executables.push(PinnedExecutable {
                name: "Config".to_string(),
                path: r"D:\Games\Old\VN1\config.exe".to_string(),
            });
            c.runner_path = Some(r"D:\Games\Old\runners\wine".to_string());
            c.prefix_path = Some(r"D:\Games\Old\VN1\pfx".to_string());
        });
        let id = state.create_collection("Queue", "#abc");
        state.add_to_collection(&id, GAME).unwrap();
        state.set_custom_order("all", vec![GAME.to_string(), "C:/Keep/k.exe".to_string()]);
        state.select(Some(GAME));
        state.set_running(Some(GAME));
        state
    }

    #[test]
    fn test_apply_scenario_rekeys_everything() {
        let mut state = populated_state();
        let stats_before = state.tables.stats.get(GAME).cloned();
        let entries_before = state.tables.entry_count();
        let remap = PathRemap::new(OLD, NEW).unwrap();

        let report = apply(&mut state, &remap);

        assert_eq!(report.moved_games, 1);
        assert_eq!(report.moved_folders, 1);
        assert_eq!(state.games[0].path, MOVED);
        assert_eq!(state.games[1].path, "C:/Keep/k.exe");
        assert_eq!(state.tables.stats.get(MOVED).cloned(), stats_before);
        assert!(!state.tables.stats.contains(GAME));
        assert_eq!(
            state.tables.metadata.get(MOVED).and_then(|m| m.title.clone()),
            Some("VN One".to_string())
        );
        assert!(state.tables.favorites.contains(MOVED));
        assert_eq!(state.tables.notes.get(MOVED).map(String::as_str), Some("route B next"));
        assert!(state.tables.collections[0].contains(MOVED));
        assert!(!state.tables.collections[0].contains(GAME));
        assert_eq!(state.tables.session_log.get(MOVED).unwrap()[0].path, MOVED);
        assert_eq!(state.tables.custom_order["all"][0], MOVED);
        assert_eq!(state.tables.recent_games[0].path, MOVED);
        assert_eq!(state.tables.pointers.selected.as_deref(), Some(MOVED));
        assert_eq!(
            state.tables.customizations.get(MOVED).and_then(|c| c.exe_override.clone()),
            Some(r"E:\NewGames\VN1\alt.exe".to_string())
        );
        assert_eq!(state.folders[0].root_path, NEW);
        assert_eq!(
            state.fingerprints.get(NEW).unwrap()[0].dir_path,
            r"E:\NewGames\VN1"
        );
        assert_eq!(state.tables.entry_count(), entries_before);
    }

    #[test]
    fn test_apply_totality_and_identity() {
        let mut state = populated_state();
        let remap = PathRemap::new(OLD, NEW).unwrap();
        apply(&mut state, &remap);

        for game in &state.games {
            assert!(!is_under(&game.path, OLD));
        }
        let t = &state.tables;
        let keyed: Vec<&str> = t
            .stats
            .paths()
            .chain(t.metadata.paths())
            .chain(t.customizations.paths())
            .chain(t.notes.paths())
            .chain(t.session_log.paths())
            .chain(t.version_history.paths())
            .chain(t.screenshots.paths())
            .chain(t.hidden.iter())
            .chain(t.favorites.iter())
            .collect();
        assert!(!keyed.is_empty());
        for path in keyed {
            assert!(!is_under(path, OLD), "{} left under old root", path);
        }

        assert!(t.hidden.contains(MOVED));
        assert_eq!(t.version_history.get(MOVED).unwrap()[0].version, "0.9");
        assert_eq!(t.screenshots.get(MOVED).unwrap()[0].file, "title.png");
        assert_eq!(t.pointers.running.as_deref(), Some(MOVED));

        let custom = t.customizations.get(MOVED).unwrap();
        assert_eq!(
            custom.pinned_executables[0].path,
            r"E:\NewGames\VN1\config.exe"
        );
        assert_eq!(custom.runner_path.as_deref(), Some(r"E:\NewGames\runners\wine"));
        assert_eq!(custom.prefix_path.as_deref(), Some(r"E:\NewGames\VN1\pfx"));

        assert!(t.stats.get("C:/Keep/k.exe").is_none());
        assert_eq!(t.custom_order["all"][1], "C:/Keep/k.exe");
    }

    #[test]
    fn test_apply_collapsing_roots_keeps_first() {
        let mut state = LibraryState::new();
        state.folders.push(LibraryFolder::new("C:/A"));
        state.folders.push(LibraryFolder::new("C:/B"));
        state.games.push(GameRecord::new("from A", "C:/A/vn/game.exe"));
        state.games.push(GameRecord::new("from B", "C:/B/vn/game.exe"));
        state.tables.stats.insert("C:/A/vn/game.exe", GameStats {
            total_secs: 5,
            ..Default::default()
        });

        let report = apply(&mut state, &PathRemap::new("C:/B", "C:/A").unwrap());

        assert_eq!(report.moved_games, 1);
        assert_eq!(state.games.len(), 1);
        assert_eq!(state.games[0].name, "from A");
        assert_eq!(state.folders.len(), 1);
        assert_eq!(state.folders[0].root_path, "C:/A");
        assert_eq!(report.dropped_entries, 0);
    }

    #[test]
    fn test_apply_collapsing_roots_data_follows_surviving_game() {
        let mut state = LibraryState::new();
        state.folders.push(LibraryFolder::new("C:/A"));
        state.folders.push(LibraryFolder::new("C:/B"));
        state.games.push(GameRecord::new("from A", "C:/A/vn/game.exe"));
        state.games.push(GameRecord::new("from B", "C:/B/vn/game.exe"));
        state.record_session("C:/A/vn/game.exe", 1, 360_000, 5);
        state.record_session("C:/B/vn/game.exe", 2, 5, 5);
        state.set_note("C:/B/vn/game.exe", "only B has a note");

        let report = apply(&mut state, &PathRemap::new("C:/A", "C:/B").unwrap());

        assert_eq!(state.games.len(), 1);
        assert_eq!(state.games[0].name, "from A");
        assert_eq!(state.games[0].path, "C:/B/vn/game.exe");
        let stats = state.tables.stats.get("C:/B/vn/game.exe").unwrap();
        assert_eq!(stats.total_secs, 360_000);
        assert_eq!(state.tables.stats.len(), 1);
        let sessions = state.tables.session_log.get("C:/B/vn/game.exe").unwrap();
        assert_eq!(sessions[0].duration_secs, 360_000);
        assert_eq!(
            state.tables.notes.get("C:/B/vn/game.exe").map(String::as_str),
            Some("only B has a note")
        );
        assert_eq!(report.dropped_entries, 2);
    }

    #[test]
    fn test_apply_without_matches_changes_nothing() {
        let mut state = populated_state();
        let before = state.clone();

        let report = apply(&mut state, &PathRemap::new("Z:/Nothing", "Y:/Else").unwrap());

        assert_eq!(report, MigrationReport::default());
        assert_eq!(state, before);
    }
}
