//! Configuration sections

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Library storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibrarySettings {
    /// Directory holding the library store (None = platform default)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Number of entries kept in the recently-launched list
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_recent_limit() -> usize {
    5
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            recent_limit: default_recent_limit(),
        }
    }
}

/// Executable discovery heuristics used by the filesystem scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// File extensions treated as game executables (lowercase, no dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Files smaller than this are ignored (KiB)
    #[serde(default = "default_min_file_size_kb")]
    pub min_file_size_kb: u64,

    /// Directory names never descended into
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,

    /// Executables whose stem contains one of these are skipped
    #[serde(default = "default_blocked_fragments")]
    pub blocked_name_fragments: Vec<String>,

    /// Executables whose stem starts with one of these are skipped
    #[serde(default = "default_blocked_prefixes")]
    pub blocked_name_prefixes: Vec<String>,

    /// Stems that say nothing about the game; the parent folder name is used instead
    #[serde(default = "default_generic_names")]
    pub generic_names: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["exe".to_string()]
}

fn default_min_file_size_kb() -> u64 {
    100
}

fn default_skip_dirs() -> Vec<String> {
    ["git", "node_modules"].iter().map(|s| s.to_string()).collect()
}

fn default_blocked_fragments() -> Vec<String> {
    ["crashhandler", "uninstall", "setup", "helper"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_blocked_prefixes() -> Vec<String> {
    ["unins", "dxsetup", "vcredist", "git-"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_generic_names() -> Vec<String> {
    [
        "game",
        "start",
        "play",
        "launch",
        "launcher",
        "nw",
        "nwjs",
        "app",
        "electron",
        "main",
        "run",
        "exec",
        "renpy",
        "lib",
        "engine",
        "ux",
        "client",
        "project",
        "visual_novel",
        "vn",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            min_file_size_kb: default_min_file_size_kb(),
            skip_dirs: default_skip_dirs(),
            blocked_name_fragments: default_blocked_fragments(),
            blocked_name_prefixes: default_blocked_prefixes(),
            generic_names: default_generic_names(),
        }
    }
}

/// Library synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Use the mtime-diffing scanner for routine syncs
    #[serde(default = "default_true")]
    pub incremental: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            incremental: default_true(),
        }
    }
}
