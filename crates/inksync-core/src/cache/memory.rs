//! In-process note cache

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Note, NoteKey};
use crate::store::{CachedNote, NoteCache, RecordAwareStore};
use crate::util::unix_millis_now;

#[derive(Debug, Default)]
pub struct MemoryNoteCache {
    notes: Mutex<HashMap<NoteKey, CachedNote>>,
}

impl MemoryNoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry with an explicit cache timestamp.
    pub fn insert(&self, note: Note, cached_at: i64) {
        self.lock().insert(
            note.key(),
            CachedNote {
                note,
                cached_at,
                dirty: false,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn store(&self, key: &NoteKey, note: &Note, dirty: bool) {
        self.lock().insert(
            key.clone(),
            CachedNote {
                note: note.clone(),
                cached_at: unix_millis_now(),
                dirty,
            },
        );
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<NoteKey, CachedNote>> {
        self.notes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl NoteCache for MemoryNoteCache {
    async fn get(&self, key: &NoteKey) -> Result<Option<CachedNote>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn put(&self, key: &NoteKey, note: &Note) -> Result<()> {
        self.store(key, note, false);
        Ok(())
    }

    async fn put_unsynced(&self, key: &NoteKey, note: &Note) -> Result<()> {
        self.store(key, note, true);
        Ok(())
    }

    fn record_aware(&self) -> Option<&dyn RecordAwareStore> {
        Some(self)
    }
}

#[async_trait]
impl RecordAwareStore for MemoryNoteCache {
    async fn find_note_by_record_uuid(&self, record_uuid: &str) -> Result<Option<CachedNote>> {
        Ok(self
            .lock()
            .values()
            .filter(|cached| cached.note.record_uuid == record_uuid)
            .max_by_key(|cached| cached.cached_at)
            .cloned())
    }
}
