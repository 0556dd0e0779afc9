//! Library folder registry
//!
//! Registered roots are scanned in registration order. Removing a root
//! cascades to the games beneath it; their per-game data stays behind so a
//! later re-add of the same root finds it again.

use crate::LibraryError;
use crate::path_key::PathKey;
use crate::records::{GameRecord, LibraryFolder};
use crate::state::LibraryState;

/// Register a new root
pub fn add_folder(state: &mut LibraryState, root: &str) -> Result<LibraryFolder, LibraryError> {
    let root = root.trim();
    let key = PathKey::new(root);
    if key.is_empty() {
        return Err(LibraryError::EmptyFolderPath);
    }
    if find(state, &key).is_some() {
        return Err(LibraryError::FolderAlreadyRegistered(root.to_string()));
    }

    let folder = LibraryFolder::new(root);
    state.folders.push(folder.clone());
    tracing::info!("Registered library folder {}", folder.root_path);
    Ok(folder)
}

/// Registered roots in scan order
pub fn list_folders(state: &LibraryState) -> &[LibraryFolder] {
    &state.folders
}

/// Unregister a root and remove every game beneath it.
///
/// Returns the removed games. The fingerprint cache for the root is
/// dropped; dependent tables are left untouched.
pub fn remove_folder(
    state: &mut LibraryState,
    root: &str,
) -> Result<Vec<GameRecord>, LibraryError> {
    let key = PathKey::new(root);
    let idx = find(state, &key).ok_or_else(|| LibraryError::FolderNotRegistered(root.to_string()))?;
    let folder = state.folders.remove(idx);

    let (removed, kept): (Vec<GameRecord>, Vec<GameRecord>) = std::mem::take(&mut state.games)
        .into_iter()
        .partition(|g| folder.owns(&g.path));
    state.games = kept;
    state.fingerprints.remove(&folder.root_path);

    tracing::info!(
        "Removed library folder {} with {} game(s)",
        folder.root_path,
        removed.len()
    );
    Ok(removed)
}

fn find(state: &LibraryState, key: &PathKey) -> Option<usize> {
    state
        .folders
        .iter()
        .position(|f| PathKey::new(&f.root_path) == *key)
}
