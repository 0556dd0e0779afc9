//! Data directory resolution
//!
//! Shelf runs either installed (data under the platform's app-data
//! directory) or portable (data next to the executable). Portable mode is
//! switched on by the `SHELF_PORTABLE` environment variable or by a marker
//! file beside the binary.

use std::path::{Path, PathBuf};

/// Environment variable enabling portable mode
pub const PORTABLE_ENV: &str = "SHELF_PORTABLE";

/// Marker files enabling portable mode when placed next to the executable
pub const PORTABLE_MARKERS: [&str; 2] = ["portable.mode", ".portable"];

const APP_DIR_NAME: &str = "shelf";
const PORTABLE_DIR_NAME: &str = "shelf-data";

fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
}

fn env_flag_enabled(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Decide portable mode from an environment value and the executable directory
pub fn portable_mode(env_value: Option<&str>, exe_dir: Option<&Path>) -> bool {
    if env_value.is_some_and(env_flag_enabled) {
        return true;
    }

    exe_dir.is_some_and(|dir| PORTABLE_MARKERS.iter().any(|m| dir.join(m).exists()))
}

/// Whether the running process is in portable mode
pub fn is_portable_mode() -> bool {
    let env_value = std::env::var(PORTABLE_ENV).ok();
    portable_mode(env_value.as_deref(), executable_dir().as_deref())
}

fn platform_data_root() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Default directory for the library store and user config
pub fn default_data_dir() -> PathBuf {
    if is_portable_mode() {
        return executable_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(PORTABLE_DIR_NAME);
    }
    platform_data_root()
}
