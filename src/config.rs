//! Persisted user configuration
//!
//! Credentials and the last used destination folder are stored as JSON in the
//! system's standard configuration directory, so they only have to be entered
//! once.

use crate::ProviderKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Name of the configuration file inside the configuration directory
const CONFIG_FILE_NAME: &str = "userconfig.json";

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine configuration directory location
    #[error("Failed to determine configuration directory location")]
    ConfigDirectoryNotFound,

    /// Failed to create or access the configuration directory
    #[error("Failed to create configuration directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the configuration file
    #[error("Failed to write configuration file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize the configuration
    #[error("Failed to serialize configuration: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// The persisted configuration record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Library root used by the previous run
    pub download_path: Option<PathBuf>,
    #[serde(alias = "TMDB_API_KEY")]
    pub tmdb_api_key: Option<String>,
    #[serde(alias = "TVDB_API_KEY")]
    pub tvdb_api_key: Option<String>,
    /// Subscriber PIN, only needed for user-supported TVDB keys
    #[serde(alias = "TVDB_PIN")]
    pub tvdb_pin: Option<String>,
}

/// Location of the configuration file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Opens the configuration file in the system's standard location
    ///
    /// - Linux: ~/.config/titlecardfetcher/userconfig.json
    /// - macOS: ~/Library/Application Support/de.titlecards.titlecardfetcher/userconfig.json
    /// - Windows: %APPDATA%\titlecards\titlecardfetcher\config\userconfig.json
    pub fn open() -> Result<Self, ConfigError> {
        let proj_dirs = directories::ProjectDirs::from("de", "titlecards", "titlecardfetcher")
            .ok_or(ConfigError::ConfigDirectoryNotFound)?;

        Ok(Self::at(proj_dirs.config_dir().join(CONFIG_FILE_NAME)))
    }

    /// Uses an explicit configuration file path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the configuration file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration
    ///
    /// A missing or unreadable file yields the default configuration; a
    /// corrupt file is reported and otherwise treated the same way.
    pub fn load(&self) -> UserConfig {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return UserConfig::default(),
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "ignoring unreadable configuration");
            UserConfig::default()
        })
    }

    /// Writes the configuration, creating the directory if needed
    pub fn save(&self, config: &UserConfig) -> Result<(), ConfigError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| ConfigError::DirectoryCreationFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        let content = serde_json::to_string_pretty(config)?;

        fs::write(&self.path, content).map_err(|e| ConfigError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }
}

/// Treats blank strings as absent
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl UserConfig {
    /// The stored API key for a provider
    pub fn api_key(&self, provider: ProviderKind) -> Option<String> {
        let key = match provider {
            ProviderKind::Tmdb => self.tmdb_api_key.clone(),
            ProviderKind::Tvdb => self.tvdb_api_key.clone(),
        };
        non_empty(key)
    }

    /// Stores an API key for a provider, returning whether it changed
    pub fn set_api_key(&mut self, provider: ProviderKind, key: String) -> bool {
        let slot = match provider {
            ProviderKind::Tmdb => &mut self.tmdb_api_key,
            ProviderKind::Tvdb => &mut self.tvdb_api_key,
        };
        let changed = slot.as_deref() != Some(key.as_str());
        *slot = Some(key);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path().join("userconfig.json"));
        assert_eq!(store.load(), UserConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path().join("nested").join("userconfig.json"));
        let config = UserConfig {
            download_path: Some(PathBuf::from("/srv/media/tv")),
            tmdb_api_key: Some("tmdb".to_string()),
            tvdb_api_key: None,
            tvdb_pin: Some("1234".to_string()),
        };

        store.save(&config).unwrap();
        assert_eq!(store.load(), config);
    }

    #[test]
    fn test_corrupt_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("userconfig.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(ConfigStore::at(path).load(), UserConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("userconfig.json");
        fs::write(&path, r#"{"tvdb_api_key":"abc"}"#).unwrap();

        let config = ConfigStore::at(path).load();
        assert_eq!(config.api_key(ProviderKind::Tvdb).as_deref(), Some("abc"));
        assert_eq!(config.api_key(ProviderKind::Tmdb), None);
        assert_eq!(config.download_path, None);
    }

    #[test]
    fn test_set_api_key_reports_change() {
        let mut config = UserConfig::default();
        assert!(config.set_api_key(ProviderKind::Tmdb, "one".to_string()));
        assert!(!config.set_api_key(ProviderKind::Tmdb, "one".to_string()));
        assert!(config.set_api_key(ProviderKind::Tmdb, "two".to_string()));
        assert_eq!(config.api_key(ProviderKind::Tmdb).as_deref(), Some("two"));
    }

    #[test]
    fn test_blank_key_is_absent() {
        let config = UserConfig {
            tmdb_api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(config.api_key(ProviderKind::Tmdb), None);
    }

    #[test]
    fn test_loads_upper_case_credential_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("userconfig.json");
        fs::write(
            &path,
            r#"{"download_path":"/srv/tv","TMDB_API_KEY":"abc","TVDB_API_KEY":"def","TVDB_PIN":"1234"}"#,
        )
        .unwrap();

        let config = ConfigStore::at(&path).load();
        assert_eq!(config.download_path, Some(PathBuf::from("/srv/tv")));
        assert_eq!(config.api_key(ProviderKind::Tmdb).as_deref(), Some("abc"));
        assert_eq!(config.api_key(ProviderKind::Tvdb).as_deref(), Some("def"));
        assert_eq!(config.tvdb_pin.as_deref(), Some("1234"));
    }
}
