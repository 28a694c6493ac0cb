use std::path::{Path, PathBuf};

use inksync_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config::{default_config_path, CliConfig};
use crate::error::CliError;

/// Values `config set` accepts. `None` keeps the current value.
#[derive(Debug, Default)]
pub struct ConfigUpdate {
    pub server_url: Option<String>,
    pub conflict_retries: Option<u32>,
    pub reconnect_debounce_ms: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub db_path: Option<PathBuf>,
}

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    let path = default_config_path()?;
    match command {
        ConfigCommands::Show => {
            let config = CliConfig::load_from_path(&path)?;
            println!("# {}", path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Set {
            server_url,
            conflict_retries,
            reconnect_debounce_ms,
            cache_ttl_secs,
            request_timeout_secs,
            db_path,
        } => {
            let update = ConfigUpdate {
                server_url,
                conflict_retries,
                reconnect_debounce_ms,
                cache_ttl_secs,
                request_timeout_secs,
                db_path,
            };
            apply_config_update(&path, update)?;
            println!("Saved CLI config at {}", path.display());
        }
        ConfigCommands::Unset { key } => {
            unset_config_value(&path, &key)?;
            println!("Removed {key} from {}", path.display());
        }
    }
    Ok(())
}

pub fn apply_config_update(path: &Path, update: ConfigUpdate) -> Result<CliConfig, CliError> {
    let mut config = CliConfig::load_from_path(path)?;

    if let Some(url) = normalize_text_option(update.server_url) {
        config.sync.server_url = Some(url);
    }
    if let Some(retries) = update.conflict_retries {
        config.sync.max_conflict_retries = retries;
    }
    if let Some(debounce) = update.reconnect_debounce_ms {
        config.sync.reconnect_debounce_ms = debounce;
    }
    if let Some(ttl) = update.cache_ttl_secs {
        config.sync.cache_ttl_secs = Some(ttl);
    }
    if let Some(timeout) = update.request_timeout_secs {
        config.sync.request_timeout_secs = timeout;
    }
    if let Some(db_path) = update.db_path {
        config.db_path = Some(db_path);
    }

    config.save_to_path(path)?;
    CliConfig::load_from_path(path)
}

pub fn unset_config_value(path: &Path, key: &str) -> Result<CliConfig, CliError> {
    let mut config = CliConfig::load_from_path(path)?;
    match key.trim() {
        "server-url" => config.sync.server_url = None,
        "cache-ttl-secs" => config.sync.cache_ttl_secs = None,
        "db-path" => config.db_path = None,
        other => {
            return Err(CliError::Config(format!(
                "unknown key '{other}' (expected server-url, cache-ttl-secs or db-path)"
            )));
        }
    }
    config.save_to_path(path)?;
    Ok(config)
}
