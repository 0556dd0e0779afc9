//! Path identity
//!
//! Every table in the library is keyed by a filesystem path, but the same
//! file may be spelled `D:\Games\A.exe`, `d:/games/a.exe` or with a trailing
//! separator on its folder. [`PathKey`] is the canonical form used for all
//! equality and lookup: lowercase, `/` separators, no trailing separators.
//! Raw paths are what gets stored; keys are always derived.

use std::fmt;

/// Normalized path identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(String);

/// Case-fold one character and unify its separator
fn fold_char(ch: char) -> impl Iterator<Item = char> {
    let ch = if ch == '\\' { '/' } else { ch };
    ch.to_lowercase()
}

impl PathKey {
    /// Derive the key for a raw path
    pub fn new(raw: &str) -> Self {
        let mut key: String = raw.chars().flat_map(fold_char).collect();
        while key.ends_with('/') {
            key.pop();
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if `self` equals `root` or lies beneath it.
    ///
    /// An empty root owns nothing.
    pub fn is_under(&self, root: &PathKey) -> bool {
        if root.is_empty() {
            return false;
        }
        match self.0.strip_prefix(root.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PathKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Normalize a raw path into its identity key
pub fn normalize(raw: &str) -> PathKey {
    PathKey::new(raw)
}

/// Two raw paths name the same entity
pub fn same_entity(a: &str, b: &str) -> bool {
    PathKey::new(a) == PathKey::new(b)
}

/// `path` is `root` itself or anything beneath it
pub fn is_under(path: &str, root: &str) -> bool {
    PathKey::new(path).is_under(&PathKey::new(root))
}

/// Split `path` at the end of its `root` prefix and return the remainder in
/// the path's original spelling.
///
/// The prefix is matched on normalized forms, so `D:\GAMES\Old\x.exe`
/// under `d:/games/old` yields `\x.exe`. Returns `None` when `path` is not
/// under `root`.
pub fn strip_root<'a>(path: &'a str, root: &PathKey) -> Option<&'a str> {
    if !PathKey::new(path).is_under(root) {
        return None;
    }

    let target = root.as_str().len();
    let mut consumed = 0;
    for (idx, ch) in path.char_indices() {
        if consumed == target {
            return Some(&path[idx..]);
        }
        consumed += fold_char(ch).map(char::len_utf8).sum::<usize>();
        if consumed > target {
            return None;
        }
    }

    (consumed == target).then_some("")
}
