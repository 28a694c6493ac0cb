use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use inksync_core::cache::SqliteNoteCache;
use inksync_core::store::{CachedNote, HttpNoteStore, NoteCache, RemoteNoteStore};
use inksync_core::{
    ConnectivityMonitor, Note, NoteKey, NoteSession, NoteSyncService, SyncConfig, SyncPolicy,
};
use serde::Serialize;

use crate::config::CliConfig;
use crate::error::CliError;

const DB_PATH_ENV: &str = "INKSYNC_DB_PATH";

#[derive(Debug, Serialize)]
pub struct NoteSummary {
    pub book_key: String,
    pub record_uuid: String,
    pub version: i64,
    pub pages: usize,
    pub strokes: usize,
    pub erased: usize,
    pub created_at: i64,
    pub updated_at: i64,
    pub updated_at_iso: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<i64>,
}

pub fn note_summary(note: &Note, cached_at: Option<i64>) -> NoteSummary {
    NoteSummary {
        book_key: note.book_key.clone(),
        record_uuid: note.record_uuid.clone(),
        version: note.version,
        pages: note.pages.len(),
        strokes: note.stroke_count(),
        erased: note.erased_count(),
        created_at: note.created_at,
        updated_at: note.updated_at,
        updated_at_iso: format_timestamp(note.updated_at),
        cached_at,
    }
}

pub fn format_cached_lines(notes: &[CachedNote]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    notes
        .iter()
        .map(|cached| {
            let note = &cached.note;
            format!(
                "{:<40}  v{:<4}  {:>3} pages  {:>5} strokes  cached {}{}",
                note.key().to_string(),
                note.version,
                note.pages.len(),
                note.stroke_count(),
                format_relative_time(cached.cached_at, now_ms),
                if cached.dirty { "  (not pushed)" } else { "" }
            )
        })
        .collect()
}

pub fn format_note_details(note: &Note, cached_at: Option<i64>) -> Vec<String> {
    let mut lines = vec![
        format!("note      {}", note.key()),
        format!("version   {}", note.version),
        format!("created   {}", format_timestamp(note.created_at)),
        format!("updated   {}", format_timestamp(note.updated_at)),
    ];
    if let Some(cached_at) = cached_at {
        lines.push(format!("cached    {}", format_timestamp(cached_at)));
    }
    if let (Some(width), Some(height)) = (note.canvas_width, note.canvas_height) {
        lines.push(format!("canvas    {width} x {height}"));
    }
    for (index, page) in note.pages.iter().enumerate() {
        lines.push(format!("page {:<4} {} strokes", index + 1, page.len()));
    }
    lines.push(format!(
        "erased    {} strokes across {} events",
        note.erased_count(),
        note.erased_strokes_by_event.len()
    ));
    lines
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}

pub fn note_key(book: &str, record: &str) -> Result<NoteKey, CliError> {
    let book = book.trim();
    let record = record.trim();
    if book.is_empty() || record.is_empty() {
        return Err(CliError::EmptyNoteKey);
    }
    Ok(NoteKey::new(book, record))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>, config: &CliConfig) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path
        .or_else(|| env::var_os(DB_PATH_ENV).map(PathBuf::from))
        .or_else(|| config.db_path.clone())
    {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("inksync").join("notes-cache.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub async fn open_cache(db_path: &Path) -> Result<SqliteNoteCache, CliError> {
    Ok(SqliteNoteCache::open_path(db_path).await?)
}

pub async fn read_cached(cache: &SqliteNoteCache, key: &NoteKey) -> Result<CachedNote, CliError> {
    cache
        .get(key)
        .await?
        .ok_or_else(|| CliError::NoteNotCached(key.to_string()))
}

/// Everything a command needs to talk to the note server.
pub struct SyncContext {
    pub service: Arc<NoteSyncService>,
    pub monitor: Arc<ConnectivityMonitor>,
    config: SyncConfig,
}

impl SyncContext {
    pub async fn open(config: &SyncConfig, db_path: &Path) -> Result<Self, CliError> {
        let server_url = config
            .server_url
            .clone()
            .ok_or(CliError::ServerNotConfigured)?;
        let remote = Arc::new(HttpNoteStore::new(server_url, config.request_timeout())?);
        let cache = Arc::new(open_cache(db_path).await?);

        let service = NoteSyncService::builder()
            .remote(Arc::clone(&remote) as Arc<dyn RemoteNoteStore>)
            .cache(cache)
            .policy(SyncPolicy::from(config))
            .build()?;
        let monitor = Arc::new(ConnectivityMonitor::new(remote));

        Ok(Self {
            service: Arc::new(service),
            monitor,
            config: config.clone(),
        })
    }

    pub fn session(&self, key: NoteKey) -> NoteSession {
        NoteSession::new(
            key,
            Arc::clone(&self.service),
            Arc::clone(&self.monitor),
            self.config.reconnect_debounce(),
        )
    }
}
