use std::collections::HashMap;
use std::env;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Largest accepted note payload
    pub max_body_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "INKSYNC_API_BIND_ADDR", DEFAULT_BIND_ADDR);
        if !bind_addr.contains(':') {
            return Err(ConfigError::Invalid(
                "INKSYNC_API_BIND_ADDR must be host:port".to_string(),
            ));
        }

        let max_body_bytes = match optional_trimmed(&lookup, "INKSYNC_API_MAX_BODY_BYTES") {
            Some(value) => value.parse::<usize>().ok().filter(|bytes| *bytes > 0).ok_or_else(|| {
                ConfigError::Invalid(
                    "INKSYNC_API_MAX_BODY_BYTES must be a positive integer".to_string(),
                )
            })?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Self {
            bind_addr,
            max_body_bytes,
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn config_defaults_without_env() {
        assert_eq!(config_from(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn config_reads_overrides() {
        let config = config_from(&[
            ("INKSYNC_API_BIND_ADDR", " 0.0.0.0:9000 "),
            ("INKSYNC_API_MAX_BODY_BYTES", "1024"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.max_body_bytes, 1024);
    }

    #[test]
    fn config_rejects_invalid_values() {
        assert!(config_from(&[("INKSYNC_API_BIND_ADDR", "localhost")]).is_err());
        let err = config_from(&[("INKSYNC_API_MAX_BODY_BYTES", "0")]).unwrap_err();
        assert!(err.to_string().contains("INKSYNC_API_MAX_BODY_BYTES"));
    }
}
