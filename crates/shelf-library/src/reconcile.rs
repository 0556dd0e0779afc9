//! Scan merge
//!
//! Folds one root's fresh scan into the library's game list. Games outside
//! the root pass through untouched. Inside the root:
//!
//! - a scanned game that already exists keeps its existing record as is;
//! - a scanned game that is new is added as installed;
//! - an existing game missing from the scan is kept as uninstalled when it
//!   carries user data, and dropped otherwise.
//!
//! The result is de-duplicated by path identity, first occurrence winning.
//! Merging the same scan twice yields the same list.

use crate::path_key::PathKey;
use crate::records::{GameRecord, dedup_games};
use std::collections::{HashMap, HashSet};

/// Outcome of merging one root
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub games: Vec<GameRecord>,
    /// Scanned games that were already known
    pub kept: usize,
    /// Scanned games seen for the first time
    pub added: usize,
    /// Missing games retained as uninstalled
    pub soft_deleted: usize,
    /// Missing games without user data, removed
    pub dropped: usize,
}

/// Merge `scanned` (the fresh result for `folder_root`) into `current`.
///
/// `has_user_data` decides whether a game that vanished from disk must be
/// kept. Scanned records that do not lie under `folder_root` are ignored.
pub fn merge(
    current: &[GameRecord],
    scanned: Vec<GameRecord>,
    folder_root: &str,
    has_user_data: impl Fn(&PathKey) -> bool,
) -> MergeOutcome {
    let root = PathKey::new(folder_root);
    let (inside, outside): (Vec<&GameRecord>, Vec<&GameRecord>) =
        current.iter().partition(|g| g.key().is_under(&root));

    let mut existing: HashMap<PathKey, &GameRecord> = HashMap::with_capacity(inside.len());
    for game in &inside {
        existing.entry(game.key()).or_insert(*game);
    }

    let mut outcome = MergeOutcome::default();
    let mut seen: HashSet<PathKey> = HashSet::with_capacity(scanned.len());
    let mut updated: Vec<GameRecord> = Vec::with_capacity(scanned.len());

    for game in scanned {
        let key = game.key();
        if !key.is_under(&root) {
            tracing::debug!("Ignoring scanned game outside {}: {}", folder_root, game.path);
            continue;
        }
        if !seen.insert(key.clone()) {
            continue;
        }
        match existing.get(&key) {
            Some(known) => {
                updated.push((*known).clone());
                outcome.kept += 1;
            }
            None => {
                updated.push(GameRecord {
                    installed: true,
                    ..game
                });
                outcome.added += 1;
            }
        }
    }

    for game in inside {
        let key = game.key();
        if !seen.insert(key.clone()) {
            continue;
        }
        if has_user_data(&key) {
            updated.push(GameRecord {
                installed: false,
                ..game.clone()
            });
            outcome.soft_deleted += 1;
        } else {
            outcome.dropped += 1;
        }
    }

    let merged: Vec<GameRecord> = outside.into_iter().cloned().chain(updated).collect();
    outcome.games = dedup_games(merged);
    outcome
}
