use std::path::Path;

use inksync_core::{SyncConfig, SyncStatus};
use serde::Serialize;

use crate::commands::common::{open_cache, SyncContext};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub server_url: Option<String>,
    pub status: String,
    pub cache_path: String,
    pub cached_notes: usize,
    pub unsynced_notes: usize,
}

pub async fn run_status(config: &SyncConfig, db_path: &Path, as_json: bool) -> Result<(), CliError> {
    let report = collect_status(config, db_path).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "server    {}",
        report.server_url.as_deref().unwrap_or("(not configured)")
    );
    println!("status    {}", report.status);
    println!("cache     {}", report.cache_path);
    println!(
        "notes     {} ({} not pushed)",
        report.cached_notes, report.unsynced_notes
    );
    Ok(())
}

pub async fn collect_status(config: &SyncConfig, db_path: &Path) -> Result<StatusReport, CliError> {
    let cached = open_cache(db_path).await?.list().await?;
    let unsynced_notes = cached.iter().filter(|cached| cached.dirty).count();

    let status = if config.server_url.is_some() {
        let context = SyncContext::open(config, db_path).await?;
        context.monitor.start().await
    } else {
        SyncStatus::Offline
    };

    Ok(StatusReport {
        server_url: config.server_url.clone(),
        status: status.label().to_string(),
        cache_path: db_path.display().to_string(),
        cached_notes: cached.len(),
        unsynced_notes,
    })
}
