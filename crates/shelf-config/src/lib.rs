//! Configuration management for Shelf
//!
//! Handles library storage settings, scanner heuristics and sync behaviour.
//! Configuration lives in a TOML file inside the data directory; every
//! section and field falls back to its default when absent.

mod data_paths;
mod settings;

pub use data_paths::{
    PORTABLE_ENV, PORTABLE_MARKERS, default_data_dir, is_portable_mode, portable_mode,
};
pub use settings::{LibrarySettings, ScannerSettings, SyncSettings};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Name of the config file inside the data directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Name of the library store inside the data directory
pub const STORE_FILE_NAME: &str = "library.db";

/// Main Shelf configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelfConfig {
    #[serde(default)]
    pub library: LibrarySettings,

    #[serde(default)]
    pub scanner: ScannerSettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl ShelfConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default data directory
    pub fn load_default() -> Result<Self, ConfigError> {
        let user_config = default_data_dir().join(CONFIG_FILE_NAME);
        if user_config.exists() {
            return Self::load(&user_config);
        }

        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scanner.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "scanner.extensions must name at least one extension".to_string(),
            ));
        }
        if self.library.recent_limit == 0 {
            return Err(ConfigError::Invalid(
                "library.recent_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory holding the store, honouring an explicit override
    pub fn data_dir(&self) -> PathBuf {
        self.library.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Full path of the library store
    pub fn store_path(&self) -> PathBuf {
        self.data_dir().join(STORE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = ShelfConfig::default();
        assert_eq!(config.library.recent_limit, 5);
        assert!(config.sync.incremental);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound(PathBuf::from("/tmp/shelf/config.toml"));
        assert!(format!("{}", err).contains("not found"));

        let err = ConfigError::Invalid("test error".to_string());
        assert!(format!("{}", err).contains("Invalid"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
[library]
data_dir = "/srv/shelf"
recent_limit = 8

[scanner]
extensions = ["exe", "sh"]

[sync]
incremental = false
"#;
        write!(temp_file, "{}", config_content).unwrap();

        let config = ShelfConfig::load(temp_file.path()).unwrap();
        assert_eq!(config.library.recent_limit, 8);
        assert_eq!(config.scanner.extensions, vec!["exe", "sh"]);
        assert_eq!(config.scanner.min_file_size_kb, 100);
        assert!(!config.sync.incremental);
        assert_eq!(config.store_path(), PathBuf::from("/srv/shelf").join(STORE_FILE_NAME));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ShelfConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "[library]\nrecent_limit = 0\n").unwrap();

        let err = ShelfConfig::load(temp_file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_save_config_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut config = ShelfConfig::default();
        config.library.recent_limit = 3;

        config.save(&path).unwrap();

        let loaded = ShelfConfig::load(&path).unwrap();
        assert_eq!(loaded.library.recent_limit, 3);
    }
}
