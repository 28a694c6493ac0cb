//! Collaborator interfaces of the sync engine, plus their stock implementations.
//!
//! The sync adapter, the session and the connectivity monitor receive these as
//! trait objects so tests and binaries can plug in whatever backs them.

#[cfg(test)]
mod flaky;
mod http;
mod memory;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{Note, NoteKey};

pub use http::HttpNoteStore;
pub use memory::MemoryNoteStore;

#[cfg(test)]
pub use flaky::FlakyNoteStore;

/// Authoritative note storage on the server.
#[async_trait]
pub trait RemoteNoteStore: Send + Sync {
    /// Fetch the server copy. `Ok(None)` when the server has no note.
    async fn fetch_note(&self, key: &NoteKey) -> Result<Option<Note>>;

    /// Submit `note` with its proposed version.
    ///
    /// Returns the server's canonical copy, [`Error::VersionConflict`] when
    /// the version is stale, or [`Error::Network`] on transport failure.
    async fn save_note(&self, key: &NoteKey, note: &Note) -> Result<Note>;
}

/// A note read from the local cache together with when it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedNote {
    pub note: Note,
    /// Unix ms
    pub cached_at: i64,
    /// Holds local saves the server has not accepted yet
    pub dirty: bool,
}

/// Local write-through cache of notes.
#[async_trait]
pub trait NoteCache: Send + Sync {
    async fn get(&self, key: &NoteKey) -> Result<Option<CachedNote>>;

    /// Store a copy the server has confirmed. Clears the dirty mark.
    async fn put(&self, key: &NoteKey, note: &Note) -> Result<()>;

    /// Store a local save that still has to reach the server.
    async fn put_unsynced(&self, key: &NoteKey, note: &Note) -> Result<()>;

    /// Record-scoped lookup, when the cache supports it.
    fn record_aware(&self) -> Option<&dyn RecordAwareStore> {
        None
    }
}

/// Optional capability: find a cached note by record alone.
#[async_trait]
pub trait RecordAwareStore: Send + Sync {
    async fn find_note_by_record_uuid(&self, record_uuid: &str) -> Result<Option<CachedNote>>;
}

/// Verifies the note server actually answers.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn is_server_reachable(&self) -> bool;
}

/// Server-side version rule shared by every store that accepts saves.
///
/// `incoming.version` must be exactly one above the stored version (or 1 when
/// nothing is stored). On success the stored note keeps its original
/// `created_at` and gets `updated_at = now`.
pub fn apply_versioned_save(current: Option<&Note>, mut incoming: Note, now: i64) -> Result<Note> {
    let current_version = current.map_or(0, |note| note.version);
    let expected = current_version + 1;
    if incoming.version != expected {
        tracing::debug!(
            "Rejecting save of {}: proposed v{}, stored v{current_version}",
            incoming.key(),
            incoming.version
        );
        return Err(Error::VersionConflict {
            server_version: Some(current_version),
        });
    }

    if let Some(current) = current {
        incoming.created_at = current.created_at;
    } else if incoming.created_at <= 0 {
        incoming.created_at = now;
    }
    incoming.updated_at = now;
    Ok(incoming)
}
