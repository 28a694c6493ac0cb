//! Note sync adapter.
//!
//! `NoteSyncService` fronts the remote store and the local cache: reads
//! prefer the server and fall back to the cache, saves go to the server and
//! are merged and retried a bounded number of times on version conflicts.

pub mod merge;
mod scheduled;

use std::sync::Arc;
use std::time::Duration;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::models::{Note, NoteKey};
use crate::store::{CachedNote, NoteCache, RemoteNoteStore};
use crate::util::unix_millis_now;

pub use merge::{
    drop_erased_strokes, merge_erased_strokes, merge_note_pages, merge_notes, merge_page,
    rebase_note,
};
pub use scheduled::ScheduledTask;

/// Retry and cache tunables of [`NoteSyncService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Merge-and-retry rounds after the first conflicting save
    pub max_conflict_retries: u32,
    /// Serve cached notes younger than this without asking the server
    pub cache_ttl: Option<Duration>,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            max_conflict_retries: crate::config::DEFAULT_CONFLICT_RETRIES,
            cache_ttl: None,
        }
    }
}

impl From<&SyncConfig> for SyncPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self {
            max_conflict_retries: config.max_conflict_retries,
            cache_ttl: config.cache_ttl(),
        }
    }
}

/// Wires a [`NoteSyncService`] from its collaborators.
#[derive(Default)]
pub struct NoteSyncServiceBuilder {
    remote: Option<Arc<dyn RemoteNoteStore>>,
    cache: Option<Arc<dyn NoteCache>>,
    policy: SyncPolicy,
}

impl NoteSyncServiceBuilder {
    #[must_use]
    pub fn remote(mut self, remote: Arc<dyn RemoteNoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn NoteCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub const fn policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<NoteSyncService> {
        let remote = self
            .remote
            .ok_or(Error::ServiceNotInitialized("remote note store"))?;
        let cache = self
            .cache
            .ok_or(Error::ServiceNotInitialized("local note cache"))?;
        Ok(NoteSyncService {
            remote,
            cache,
            policy: self.policy,
        })
    }
}

pub struct NoteSyncService {
    remote: Arc<dyn RemoteNoteStore>,
    cache: Arc<dyn NoteCache>,
    policy: SyncPolicy,
}

impl std::fmt::Debug for NoteSyncService {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("NoteSyncService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl NoteSyncService {
    pub fn builder() -> NoteSyncServiceBuilder {
        NoteSyncServiceBuilder::default()
    }

    pub const fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// Load a note, preferring the server.
    ///
    /// Without `force_refresh`, a cached copy younger than the cache TTL is
    /// returned as is. Otherwise the server copy is fetched and cached. When
    /// the server has no note the cached copy (a note never pushed) is used.
    /// When the server is unreachable the cached copy is used, and with no
    /// cached copy the call fails with [`Error::Offline`].
    ///
    /// A cached copy holding unsynced saves is never replaced by the server
    /// copy. Local work is rebased onto it instead and stays marked unsynced.
    pub async fn get_note(&self, key: &NoteKey, force_refresh: bool) -> Result<Option<Note>> {
        if !force_refresh {
            if let Some(ttl) = self.policy.cache_ttl {
                if let Some(cached) = self.cached_copy(key).await {
                    if is_fresh(&cached, ttl, unix_millis_now()) {
                        tracing::debug!("Serving {} v{} from cache", key, cached.note.version);
                        return Ok(Some(cached.note));
                    }
                }
            }
        }

        match self.remote.fetch_note(key).await {
            Ok(Some(note)) => match self.cached_copy(key).await {
                Some(cached) if cached.dirty => {
                    self.rebase_unsynced(key, &note, cached.note).await
                }
                _ => {
                    self.write_cache(key, &note).await;
                    Ok(Some(note))
                }
            },
            Ok(None) | Err(Error::NotFound(_)) => {
                let cached = self.cached_copy(key).await;
                if cached.is_some() {
                    tracing::debug!("Server has no note for {}; using local copy", key);
                }
                Ok(cached.map(|cached| cached.note))
            }
            Err(error) if error.is_network() => match self.cached_copy(key).await {
                Some(cached) => {
                    tracing::warn!(
                        "Server unreachable ({}); using cached {} v{}",
                        error,
                        key,
                        cached.note.version
                    );
                    Ok(Some(cached.note))
                }
                None => Err(Error::Offline(format!("no cached copy of {key} ({error})"))),
            },
            Err(error) => Err(error),
        }
    }

    /// Save a note whose `version` is already the proposed next version.
    ///
    /// On a version conflict the server copy is re-fetched, merged with the
    /// note (local strokes win on id), and the merge is submitted with a
    /// version above every version seen. This repeats at most
    /// `max_conflict_retries` times before the conflict is returned. Returns
    /// the server's canonical copy, which is also cached.
    pub async fn save_note(&self, key: &NoteKey, note: &Note) -> Result<Note> {
        let mut candidate = note.clone();
        let mut retries_left = self.policy.max_conflict_retries;

        loop {
            match self.remote.save_note(key, &candidate).await {
                Ok(saved) => {
                    tracing::info!("Saved {} as v{}", key, saved.version);
                    self.write_cache(key, &saved).await;
                    return Ok(saved);
                }
                Err(Error::VersionConflict { server_version }) => {
                    let conflict = Error::VersionConflict { server_version };
                    if retries_left == 0 {
                        tracing::warn!("Giving up on {} after repeated conflicts", key);
                        return Err(conflict);
                    }
                    retries_left -= 1;

                    let server = match self.remote.fetch_note(key).await {
                        Ok(Some(server)) => server,
                        Ok(None) => {
                            tracing::warn!("Conflict on {} but the server returned no note", key);
                            return Err(conflict);
                        }
                        Err(error) => {
                            tracing::warn!("Re-fetch of {} after conflict failed: {}", key, error);
                            return Err(conflict);
                        }
                    };

                    candidate = merge_notes(&server, &candidate, server_version, unix_millis_now());
                    tracing::warn!(
                        "Version conflict on {} (server v{}); retrying merged note as v{}",
                        key,
                        server.version,
                        candidate.version
                    );
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Write a local save to the cache, marked unsynced until a push succeeds.
    pub async fn store_local(&self, key: &NoteKey, note: &Note) -> Result<()> {
        self.cache.put_unsynced(key, note).await
    }

    /// Whether the cached copy of `key` holds saves the server has not accepted.
    pub async fn has_unsynced_changes(&self, key: &NoteKey) -> Result<bool> {
        Ok(self.load_local(key).await?.is_some_and(|cached| cached.dirty))
    }

    /// Read a note from the local cache only.
    pub async fn load_local(&self, key: &NoteKey) -> Result<Option<CachedNote>> {
        if let Some(cached) = self.cache.get(key).await? {
            return Ok(Some(cached));
        }
        match self.cache.record_aware() {
            Some(store) => store.find_note_by_record_uuid(&key.record_uuid).await,
            None => Ok(None),
        }
    }

    async fn cached_copy(&self, key: &NoteKey) -> Option<CachedNote> {
        match self.load_local(key).await {
            Ok(cached) => cached,
            Err(error) => {
                tracing::warn!("Failed to read cached {}: {}", key, error);
                None
            }
        }
    }

    async fn rebase_unsynced(
        &self,
        key: &NoteKey,
        server: &Note,
        local: Note,
    ) -> Result<Option<Note>> {
        if server.version <= local.version {
            tracing::debug!("Keeping unsynced {} v{}; server is not ahead", key, local.version);
            return Ok(Some(local));
        }
        let rebased = rebase_note(server, &local);
        tracing::info!(
            "Rebased unsynced {} from v{} onto server v{}",
            key,
            local.version,
            server.version
        );
        self.cache.put_unsynced(key, &rebased).await?;
        Ok(Some(rebased))
    }

    async fn write_cache(&self, key: &NoteKey, note: &Note) {
        if let Err(error) = self.cache.put(key, note).await {
            tracing::warn!("Failed to cache {} v{}: {}", key, note.version, error);
        }
    }
}

fn is_fresh(cached: &CachedNote, ttl: Duration, now: i64) -> bool {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now.saturating_sub(cached.cached_at) < ttl_ms
}
