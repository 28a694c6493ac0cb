//! libSQL-backed note cache

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::params;
use tokio::sync::Mutex;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Note, NoteKey};
use crate::store::{CachedNote, NoteCache, RecordAwareStore};
use crate::util::unix_millis_now;

/// Write-through cache of whole notes in a local database file.
#[derive(Clone)]
pub struct SqliteNoteCache {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl SqliteNoteCache {
    /// Open (or create) the cache database at `db_path`.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&db_path).await?;
        tracing::debug!("Opened note cache at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory cache (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    pub fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Every cached note, most recently cached first.
    pub async fn list(&self) -> Result<Vec<CachedNote>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT note_json, cached_at, dirty FROM note_cache ORDER BY cached_at DESC, book_key, record_uuid",
                (),
            )
            .await?;

        let mut notes = Vec::new();
        while let Some(row) = rows.next().await? {
            notes.push(parse_cached(&row)?);
        }
        Ok(notes)
    }

    /// Drop one cached note. Returns whether a row was removed.
    pub async fn remove(&self, key: &NoteKey) -> Result<bool> {
        let db = self.db.lock().await;
        let removed = db
            .connection()
            .execute(
                "DELETE FROM note_cache WHERE book_key = ?1 AND record_uuid = ?2",
                params![key.book_key.as_str(), key.record_uuid.as_str()],
            )
            .await?;
        Ok(removed > 0)
    }
}

/// Parse a `note_json, cached_at, dirty` row.
fn parse_cached(row: &libsql::Row) -> Result<CachedNote> {
    let note = serde_json::from_str::<Note>(&row.get::<String>(0)?)?;
    Ok(CachedNote {
        note,
        cached_at: row.get::<i64>(1)?,
        dirty: row.get::<i64>(2)? != 0,
    })
}

impl SqliteNoteCache {
    async fn store(&self, key: &NoteKey, note: &Note, dirty: bool) -> Result<()> {
        let note_json = serde_json::to_string(note)?;
        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT INTO note_cache (book_key, record_uuid, note_json, version, cached_at, dirty)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(book_key, record_uuid) DO UPDATE SET
                    note_json = excluded.note_json,
                    version = excluded.version,
                    cached_at = excluded.cached_at,
                    dirty = excluded.dirty",
                params![
                    key.book_key.as_str(),
                    key.record_uuid.as_str(),
                    note_json,
                    note.version,
                    unix_millis_now(),
                    i64::from(dirty)
                ],
            )
            .await?;
        tracing::debug!("Cached note {} v{} (dirty: {})", key, note.version, dirty);
        Ok(())
    }
}

#[async_trait]
impl NoteCache for SqliteNoteCache {
    async fn get(&self, key: &NoteKey) -> Result<Option<CachedNote>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT note_json, cached_at, dirty FROM note_cache WHERE book_key = ?1 AND record_uuid = ?2",
                params![key.book_key.as_str(), key.record_uuid.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_cached(&row)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &NoteKey, note: &Note) -> Result<()> {
        self.store(key, note, false).await
    }

    async fn put_unsynced(&self, key: &NoteKey, note: &Note) -> Result<()> {
        self.store(key, note, true).await
    }

    fn record_aware(&self) -> Option<&dyn RecordAwareStore> {
        Some(self)
    }
}

#[async_trait]
impl RecordAwareStore for SqliteNoteCache {
    async fn find_note_by_record_uuid(&self, record_uuid: &str) -> Result<Option<CachedNote>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT note_json, cached_at, dirty FROM note_cache WHERE record_uuid = ?1
                 ORDER BY cached_at DESC LIMIT 1",
                params![record_uuid],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_cached(&row)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Stroke, StrokePoint};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample_note(record: &str, version: i64) -> Note {
        let mut note = Note::new(&NoteKey::new("book", record));
        note.pages[0]
            .strokes
            .push(Stroke::new(vec![StrokePoint::new(1.0, 2.0)]).with_event("evt-1"));
        note.version = version;
        note
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_then_get_round_trips_the_note() {
        let cache = SqliteNoteCache::open_in_memory().await.unwrap();
        let note = sample_note("r1", 3);

        cache.put(&note.key(), &note).await.unwrap();
        let cached = cache.get(&note.key()).await.unwrap().unwrap();

        assert_eq!(cached.note, note);
        assert!(cached.cached_at > 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_overwrites_previous_copy() {
        let cache = SqliteNoteCache::open_in_memory().await.unwrap();
        let key = NoteKey::new("book", "r1");
        cache.put(&key, &sample_note("r1", 1)).await.unwrap();
        cache.put(&key, &sample_note("r1", 2)).await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap().unwrap().note.version, 2);
        assert_eq!(cache.list().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unsynced_mark_survives_reopen_until_confirmed() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("cache.db");
        let note = sample_note("r1", 2);

        let cache = SqliteNoteCache::open_path(&path).await.unwrap();
        cache.put_unsynced(&note.key(), &note).await.unwrap();
        drop(cache);

        let reopened = SqliteNoteCache::open_path(&path).await.unwrap();
        let cached = reopened.get(&note.key()).await.unwrap().unwrap();
        assert!(cached.dirty);
        assert_eq!(cached.note, note);

        reopened.put(&note.key(), &note).await.unwrap();
        assert!(!reopened.get(&note.key()).await.unwrap().unwrap().dirty);
        assert!(!reopened.list().await.unwrap()[0].dirty);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_note_is_none() {
        let cache = SqliteNoteCache::open_in_memory().await.unwrap();
        assert!(cache
            .get(&NoteKey::new("book", "missing"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_record_lookup_ignores_book() {
        let cache = SqliteNoteCache::open_in_memory().await.unwrap();
        let mut note = sample_note("r7", 4);
        note.book_key = "other-book".to_string();
        cache.put(&note.key(), &note).await.unwrap();

        let store = cache.record_aware().unwrap();
        let found = store.find_note_by_record_uuid("r7").await.unwrap().unwrap();
        assert_eq!(found.note.book_key, "other-book");
        assert!(store.find_note_by_record_uuid("r8").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cache_survives_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("cache.db");
        let note = sample_note("r1", 5);

        let cache = SqliteNoteCache::open_path(&path).await.unwrap();
        cache.put(&note.key(), &note).await.unwrap();
        drop(cache);

        let reopened = SqliteNoteCache::open_path(&path).await.unwrap();
        assert_eq!(reopened.db_path(), Some(&path));
        assert_eq!(reopened.get(&note.key()).await.unwrap().unwrap().note, note);
        assert!(reopened.remove(&note.key()).await.unwrap());
        assert!(reopened.get(&note.key()).await.unwrap().is_none());
    }
}
