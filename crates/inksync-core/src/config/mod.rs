//! Sync engine configuration.
//!
//! `SyncConfig` carries the tunables shared by the CLI and any embedding app:
//! where the note server lives, how hard to retry conflicts, and how long to
//! wait before re-syncing after the network comes back.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_CONFLICT_RETRIES: u32 = 2;
pub const DEFAULT_RECONNECT_DEBOUNCE_MS: u64 = 1_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

pub const ENV_SERVER_URL: &str = "INKSYNC_SERVER_URL";
pub const ENV_CONFLICT_RETRIES: &str = "INKSYNC_CONFLICT_RETRIES";
pub const ENV_RECONNECT_DEBOUNCE_MS: &str = "INKSYNC_RECONNECT_DEBOUNCE_MS";
pub const ENV_CACHE_TTL_SECS: &str = "INKSYNC_CACHE_TTL_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "INKSYNC_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Note server base URL
    pub server_url: Option<String>,
    /// Merge-and-retry attempts after the first conflicting save
    pub max_conflict_retries: u32,
    /// Delay before the automatic re-sync once connectivity returns
    pub reconnect_debounce_ms: u64,
    /// Serve cached notes younger than this without asking the server
    pub cache_ttl_secs: Option<u64>,
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            max_conflict_retries: DEFAULT_CONFLICT_RETRIES,
            reconnect_debounce_ms: DEFAULT_RECONNECT_DEBOUNCE_MS,
            cache_ttl_secs: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl SyncConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from defaults plus whatever `lookup` returns.
    ///
    /// Blank values are ignored. Unparseable numbers are an error rather than
    /// a silent fallback.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |name: &str| normalize_text_option(lookup(name));
        let mut config = Self {
            server_url: read(ENV_SERVER_URL),
            ..Self::default()
        };

        if let Some(value) = read(ENV_CONFLICT_RETRIES) {
            config.max_conflict_retries = parse_number(ENV_CONFLICT_RETRIES, &value)?;
        }
        if let Some(value) = read(ENV_RECONNECT_DEBOUNCE_MS) {
            config.reconnect_debounce_ms = parse_number(ENV_RECONNECT_DEBOUNCE_MS, &value)?;
        }
        if let Some(value) = read(ENV_CACHE_TTL_SECS) {
            config.cache_ttl_secs = Some(parse_number(ENV_CACHE_TTL_SECS, &value)?);
        }
        if let Some(value) = read(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout_secs = parse_number(ENV_REQUEST_TIMEOUT_SECS, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.server_url {
            if !is_http_url(url) {
                return Err(Error::Config(format!(
                    "server URL must include http:// or https:// (got '{url}')"
                )));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    pub const fn reconnect_debounce(&self) -> Duration {
        Duration::from_millis(self.reconnect_debounce_ms)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{name} must be a non-negative integer (got '{value}')")))
}
