//! Memory store with failure switches, for exercising the sync engine.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{HealthCheck, MemoryNoteStore, RemoteNoteStore};
use crate::error::{Error, Result};
use crate::models::{Note, NoteKey};

/// Wraps a [`MemoryNoteStore`] so it can go offline, lose races to a peer,
/// and count calls.
#[derive(Debug, Default)]
pub struct FlakyNoteStore {
    inner: MemoryNoteStore,
    offline: AtomicBool,
    forced_conflicts: AtomicUsize,
    fetch_calls: AtomicUsize,
    save_calls: AtomicUsize,
}

impl FlakyNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, note: Note) {
        self.inner.insert(note);
    }

    pub fn get(&self, key: &NoteKey) -> Option<Note> {
        self.inner.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Make every call fail with a network error while `offline` is true.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Reject the next `count` saves with a conflict, each one after a
    /// simulated peer bumped the stored version.
    pub fn force_conflicts(&self, count: usize) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("memory store is offline".to_string()));
        }
        Ok(())
    }

    fn take_forced_conflict(&self) -> bool {
        self.forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RemoteNoteStore for FlakyNoteStore {
    async fn fetch_note(&self, key: &NoteKey) -> Result<Option<Note>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        self.inner.fetch_note(key).await
    }

    async fn save_note(&self, key: &NoteKey, note: &Note) -> Result<Note> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        if self.take_forced_conflict() {
            let mut stored = self.inner.get(key).unwrap_or_else(|| Note::new(key));
            stored.version += 1;
            let server_version = stored.version;
            self.inner.insert(stored);
            return Err(Error::VersionConflict {
                server_version: Some(server_version),
            });
        }
        self.inner.save_note(key, note).await
    }
}

#[async_trait]
impl HealthCheck for FlakyNoteStore {
    async fn is_server_reachable(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> NoteKey {
        NoteKey::new("book", "record")
    }

    #[tokio::test]
    async fn offline_store_fails_with_network_errors() {
        let store = FlakyNoteStore::new();
        store.set_offline(true);
        assert!(store.fetch_note(&key()).await.unwrap_err().is_network());
        assert!(!store.is_server_reachable().await);

        store.set_offline(false);
        assert!(store.fetch_note(&key()).await.unwrap().is_none());
        assert_eq!(store.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn forced_conflicts_bump_the_stored_version() {
        let store = FlakyNoteStore::new();
        store.force_conflicts(1);
        let mut note = Note::new(&key());
        note.version = 1;

        let error = store.save_note(&key(), &note).await.unwrap_err();
        assert!(matches!(
            error,
            Error::VersionConflict {
                server_version: Some(1)
            }
        ));

        note.version = 2;
        assert_eq!(store.save_note(&key(), &note).await.unwrap().version, 2);
        assert_eq!(store.save_calls(), 2);
    }
}
