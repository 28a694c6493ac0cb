//! Persistent CLI configuration.
//!
//! The file only stores what the user set explicitly. At run time the
//! environment overrides it, and `--server-url` overrides both.

use std::path::{Path, PathBuf};

use inksync_core::config::{
    ENV_CACHE_TTL_SECS, ENV_CONFLICT_RETRIES, ENV_RECONNECT_DEBOUNCE_MS, ENV_REQUEST_TIMEOUT_SECS,
    ENV_SERVER_URL,
};
use inksync_core::util::normalize_text_option;
use inksync_core::SyncConfig;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "cli-config.json";
const CONFIG_DIR_ENV: &str = "INKSYNC_CONFIG_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            db_path: None,
            sync: SyncConfig::default(),
        }
    }
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    let dir = std::env::var_os(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|dir| dir.join("inksync")))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI config directory".to_string()))?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

impl CliConfig {
    pub fn load() -> Result<Self, CliError> {
        Self::load_from_path(&default_config_path()?)
    }

    /// Read the config at `path`, or defaults when the file does not exist.
    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            CliError::Config(format!("Failed to read config at {}: {error}", path.display()))
        })?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            CliError::Config(format!("Failed to parse config at {}: {error}", path.display()))
        })?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, CliError> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                CliError::Config(format!(
                    "Failed to create config directory {}: {error}",
                    parent.display()
                ))
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        normalized.sync.validate()?;
        let serialized = serde_json::to_string_pretty(&normalized)?;
        std::fs::write(path, serialized).map_err(|error| {
            CliError::Config(format!("Failed to write config at {}: {error}", path.display()))
        })
    }

    /// The sync settings to run with: file values, then environment
    /// overrides, then the command-line server URL.
    pub fn effective_sync_config(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
        server_url: Option<String>,
    ) -> Result<SyncConfig, CliError> {
        let from_env = SyncConfig::from_lookup(&lookup)?;
        let is_set = |name: &str| normalize_text_option(lookup(name)).is_some();

        let mut merged = self.sync.clone();
        if is_set(ENV_SERVER_URL) {
            merged.server_url = from_env.server_url;
        }
        if is_set(ENV_CONFLICT_RETRIES) {
            merged.max_conflict_retries = from_env.max_conflict_retries;
        }
        if is_set(ENV_RECONNECT_DEBOUNCE_MS) {
            merged.reconnect_debounce_ms = from_env.reconnect_debounce_ms;
        }
        if is_set(ENV_CACHE_TTL_SECS) {
            merged.cache_ttl_secs = from_env.cache_ttl_secs;
        }
        if is_set(ENV_REQUEST_TIMEOUT_SECS) {
            merged.request_timeout_secs = from_env.request_timeout_secs;
        }
        if let Some(url) = normalize_text_option(server_url) {
            merged.server_url = Some(url);
        }

        merged.validate()?;
        Ok(merged)
    }

    fn normalize(&mut self) {
        self.sync.server_url = normalize_text_option(self.sync.server_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
        self.db_path = self
            .db_path
            .take()
            .filter(|path| !path.as_os_str().is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.version, 1);
    }

    #[test]
    fn save_and_load_normalizes_server_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = CliConfig::default();
        config.sync.server_url = Some("  https://notes.example.com/  ".to_string());
        config.sync.max_conflict_retries = 4;
        config.save_to_path(&path).unwrap();

        let loaded = CliConfig::load_from_path(&path).unwrap();
        assert_eq!(
            loaded.sync.server_url.as_deref(),
            Some("https://notes.example.com")
        );
        assert_eq!(loaded.sync.max_conflict_retries, 4);
    }

    #[test]
    fn save_rejects_invalid_server_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CliConfig::default();
        config.sync.server_url = Some("notes.example.com".to_string());
        assert!(config.save_to_path(&dir.path().join("c.json")).is_err());
    }

    #[test]
    fn unparseable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();
        let error = CliConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(error, CliError::Config(_)));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = CliConfig::default();
        config.sync.server_url = Some("https://file.example.com".to_string());
        config.sync.max_conflict_retries = 5;
        config.sync.cache_ttl_secs = Some(60);

        let merged = config
            .effective_sync_config(
                env(&[
                    (ENV_SERVER_URL, "https://env.example.com"),
                    (ENV_RECONNECT_DEBOUNCE_MS, "250"),
                ]),
                None,
            )
            .unwrap();

        assert_eq!(merged.server_url.as_deref(), Some("https://env.example.com"));
        assert_eq!(merged.max_conflict_retries, 5);
        assert_eq!(merged.reconnect_debounce_ms, 250);
        assert_eq!(merged.cache_ttl_secs, Some(60));
    }

    #[test]
    fn flag_overrides_environment() {
        let merged = CliConfig::default()
            .effective_sync_config(
                env(&[(ENV_SERVER_URL, "https://env.example.com")]),
                Some("http://127.0.0.1:8080".to_string()),
            )
            .unwrap();
        assert_eq!(merged.server_url.as_deref(), Some("http://127.0.0.1:8080"));
    }

    #[test]
    fn bad_environment_value_is_rejected() {
        let error = CliConfig::default()
            .effective_sync_config(env(&[(ENV_CONFLICT_RETRIES, "many")]), None)
            .unwrap_err();
        assert!(matches!(error, CliError::Core(inksync_core::Error::Config(_))));
    }
}
