//! In-process note server.
//!
//! Applies the same version rule as the HTTP server and backs the reference
//! API server.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{apply_versioned_save, HealthCheck, RemoteNoteStore};
use crate::error::Result;
use crate::models::{Note, NoteKey};
use crate::util::unix_millis_now;

#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    notes: Mutex<HashMap<NoteKey, Note>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `note` as-is, bypassing the version rule.
    pub fn insert(&self, note: Note) {
        self.lock().insert(note.key(), note);
    }

    pub fn get(&self, key: &NoteKey) -> Option<Note> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<NoteKey, Note>> {
        self.notes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RemoteNoteStore for MemoryNoteStore {
    async fn fetch_note(&self, key: &NoteKey) -> Result<Option<Note>> {
        Ok(self.get(key))
    }

    async fn save_note(&self, key: &NoteKey, note: &Note) -> Result<Note> {
        let mut incoming = note.clone();
        incoming.book_key.clone_from(&key.book_key);
        incoming.record_uuid.clone_from(&key.record_uuid);

        let mut notes = self.lock();
        let saved = apply_versioned_save(notes.get(key), incoming, unix_millis_now())?;
        notes.insert(key.clone(), saved.clone());
        drop(notes);
        Ok(saved)
    }
}

#[async_trait]
impl HealthCheck for MemoryNoteStore {
    async fn is_server_reachable(&self) -> bool {
        true
    }
}
