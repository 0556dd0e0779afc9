//! Path-keyed tables
//!
//! [`PathMap`] is the only map type used for per-game data. All access goes
//! through [`PathKey`] normalization, so a lookup with a differently spelled
//! path still finds its entry. The raw path of each entry is kept alongside
//! the value because that is what gets persisted and what a folder
//! migration rewrites.

use crate::path_key::PathKey;
use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

#[derive(Debug, Clone, PartialEq)]
struct Entry<V> {
    path: String,
    value: V,
}

/// Map from path identity to a value, remembering each entry's raw path
#[derive(Debug, Clone, PartialEq)]
pub struct PathMap<V> {
    entries: BTreeMap<PathKey, Entry<V>>,
}

impl<V> Default for PathMap<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> PathMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&PathKey::new(path))
    }

    pub fn get(&self, path: &str) -> Option<&V> {
        self.entries.get(&PathKey::new(path)).map(|e| &e.value)
    }

    pub fn get_key(&self, key: &PathKey) -> Option<&V> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn contains_key(&self, key: &PathKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut V> {
        self.entries.get_mut(&PathKey::new(path)).map(|e| &mut e.value)
    }

    /// Insert or replace; the raw spelling becomes `path`
    pub fn insert(&mut self, path: impl Into<String>, value: V) -> Option<V> {
        let path = path.into();
        let key = PathKey::new(&path);
        self.entries
            .insert(key, Entry { path, value })
            .map(|old| old.value)
    }

    /// Mutable access to an entry, creating it from `init` if absent.
    /// An existing entry keeps its raw spelling.
    pub fn get_or_insert_with(&mut self, path: &str, init: impl FnOnce() -> V) -> &mut V {
        &mut self
            .entries
            .entry(PathKey::new(path))
            .or_insert_with(|| Entry {
                path: path.to_string(),
                value: init(),
            })
            .value
    }

    pub fn remove(&mut self, path: &str) -> Option<V> {
        self.entries.remove(&PathKey::new(path)).map(|e| e.value)
    }

    /// Entries as `(raw path, value)` in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.values().map(|e| (e.path.as_str(), &e.value))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|e| e.path.as_str())
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &mut V) -> bool) {
        self.entries.retain(|_, e| keep(&e.path, &mut e.value));
    }

    /// Rewrite every raw path through `rewrite`; `None` leaves a path as is.
    ///
    /// When a rewritten path collides with an entry that did not move, the
    /// unmoved entry keeps the slot. Returns the number of entries whose raw
    /// path changed.
    pub fn rekey(&mut self, rewrite: impl Fn(&str) -> Option<String>) -> usize {
        self.rekey_preferring(rewrite, |_| false).moved
    }

    /// Like [`rekey`](Self::rekey), but a moved entry takes a contested slot
    /// when `moved_wins` returns true for the slot's key.
    pub fn rekey_preferring(
        &mut self,
        rewrite: impl Fn(&str) -> Option<String>,
        moved_wins: impl Fn(&PathKey) -> bool,
    ) -> Rekeyed {
        let old = std::mem::take(&mut self.entries);
        let mut moved = Vec::new();

        for (key, entry) in old {
            match rewrite(&entry.path) {
                Some(path) if path != entry.path => moved.push(Entry {
                    path,
                    value: entry.value,
                }),
                _ => {
                    self.entries.insert(key, entry);
                }
            }
        }

        let mut outcome = Rekeyed::default();
        for entry in moved {
            let key = PathKey::new(&entry.path);
            if let Some(resident) = self.entries.get(&key) {
                outcome.dropped += 1;
                if !moved_wins(&key) {
                    tracing::warn!(
                        "Dropping {} during rekey, slot held by {}",
                        entry.path,
                        resident.path
                    );
                    continue;
                }
                tracing::warn!(
                    "Dropping {} during rekey, replaced by {}",
                    resident.path,
                    entry.path
                );
            }
            self.entries.insert(key, entry);
            outcome.moved += 1;
        }
        outcome
    }
}

/// Counts from [`PathMap::rekey_preferring`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rekeyed {
    /// Entries now stored under a new path
    pub moved: usize,
    /// Entries lost to a collision
    pub dropped: usize,
}

impl<V: Serialize> Serialize for PathMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.values().map(|e| (&e.path, &e.value)))
    }
}

struct PathMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for PathMapVisitor<V> {
    type Value = PathMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map from paths to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = PathMap::new();
        while let Some((path, value)) = access.next_entry::<String, V>()? {
            // First spelling of a key wins
            if !map.contains(&path) {
                map.insert(path, value);
            }
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for PathMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PathMapVisitor(PhantomData))
    }
}

/// Set of path identities (hidden flags, favorites)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathSet(PathMap<()>);

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    pub fn contains_key(&self, key: &PathKey) -> bool {
        self.0.contains_key(key)
    }

    /// Returns true if the path was not present
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if self.0.contains(&path) {
            return false;
        }
        self.0.insert(path, ());
        true
    }

    pub fn remove(&mut self, path: &str) -> bool {
        self.0.remove(path).is_some()
    }

    /// Add or remove depending on `on`
    pub fn set(&mut self, path: &str, on: bool) {
        if on {
            self.insert(path);
        } else {
            self.remove(path);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.paths()
    }

    pub fn rekey(&mut self, rewrite: impl Fn(&str) -> Option<String>) -> usize {
        self.0.rekey(rewrite)
    }
}

impl Serialize for PathSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.paths())
    }
}

struct PathSetVisitor;

impl<'de> Visitor<'de> for PathSetVisitor {
    type Value = PathSet;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of paths")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut set = PathSet::new();
        while let Some(path) = access.next_element::<String>()? {
            set.insert(path);
        }
        Ok(set)
    }
}

impl<'de> Deserialize<'de> for PathSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(PathSetVisitor)
    }
}
