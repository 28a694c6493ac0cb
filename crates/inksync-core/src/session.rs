//! Editing session of one note.
//!
//! `NoteSession` owns the canvas editor and drives it against the sync
//! adapter and the connectivity monitor: loading with stale-result discard,
//! the local-first save pipeline, and the automatic re-sync after reconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::canvas::CanvasEditor;
use crate::error::{Error, Result};
use crate::models::{Note, NoteKey};
use crate::state::{ConnectivityMonitor, SyncStatus};
use crate::sync::{NoteSyncService, ScheduledTask};
use crate::util::unix_millis_now;

/// Result of [`NoteSession::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The note replaced the editor contents. `unsynced` when it carries
    /// local saves the server has not accepted yet.
    Loaded { version: i64, unsynced: bool },
    /// Neither the server nor the cache knows the note; the editor is untouched
    NotFound,
    /// The canvas was edited while loading, so the result was dropped
    Stale,
}

/// Result of [`NoteSession::save`] and [`NoteSession::sync_now`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The server accepted the note at this version
    Synced { version: i64 },
    /// Written to the local cache; the server was unreachable
    SavedLocally,
    /// Nothing was pending
    NothingToSync,
}

pub struct NoteSession {
    key: NoteKey,
    editor: Mutex<CanvasEditor>,
    sync: Arc<NoteSyncService>,
    monitor: Arc<ConnectivityMonitor>,
    history_busy: AtomicBool,
    save_lock: tokio::sync::Mutex<()>,
    reconnect: ScheduledTask,
    reconnect_debounce: Duration,
}

impl std::fmt::Debug for NoteSession {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("NoteSession")
            .field("key", &self.key)
            .field("status", &self.monitor.status())
            .finish_non_exhaustive()
    }
}

/// Marks an undo or redo in progress. A second call from another thread
/// fails fast with [`Error::HistoryBusy`] instead of queueing on the editor.
/// Clears the flag when the undo/redo finishes, even on panic.
struct HistoryGuard<'a>(&'a AtomicBool);

impl<'a> HistoryGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::HistoryBusy)?;
        Ok(Self(flag))
    }
}

impl Drop for HistoryGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl NoteSession {
    /// Start a session on a blank editor for `key`.
    pub fn new(
        key: NoteKey,
        sync: Arc<NoteSyncService>,
        monitor: Arc<ConnectivityMonitor>,
        reconnect_debounce: Duration,
    ) -> Self {
        Self {
            editor: Mutex::new(CanvasEditor::new(key.clone())),
            key,
            sync,
            monitor,
            history_busy: AtomicBool::new(false),
            save_lock: tokio::sync::Mutex::new(()),
            reconnect: ScheduledTask::new(),
            reconnect_debounce,
        }
    }

    pub const fn key(&self) -> &NoteKey {
        &self.key
    }

    pub fn status(&self) -> SyncStatus {
        self.monitor.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.monitor.subscribe()
    }

    /// Run a synchronous edit against the canvas.
    pub fn with_editor<R>(&self, edit: impl FnOnce(&mut CanvasEditor) -> R) -> R {
        edit(&mut self.editor())
    }

    /// Committed state of the canvas.
    pub fn snapshot(&self) -> Note {
        self.editor().snapshot_note()
    }

    /// Fetch the note and load it into the editor.
    ///
    /// The fetched note is dropped when the canvas changed while the fetch was
    /// in flight, so a slow network never overwrites fresh strokes. Saves the
    /// server has not accepted yet are kept: the cache rebases them onto a
    /// newer server copy, and the session is marked as having pending changes.
    pub async fn load(&self, force_refresh: bool) -> Result<LoadOutcome> {
        let _serial = self.save_lock.lock().await;

        let generation = self.editor().generation();
        let note = self.sync.get_note(&self.key, force_refresh).await?;
        let unsynced = self.sync.has_unsynced_changes(&self.key).await?;
        if unsynced {
            self.monitor.mark_local_saved();
        }

        let mut editor = self.editor();
        if editor.generation() != generation {
            tracing::debug!(
                "Discarding load of {}: canvas changed from generation {} to {}",
                self.key,
                generation,
                editor.generation()
            );
            return Ok(LoadOutcome::Stale);
        }
        let Some(note) = note else {
            return Ok(LoadOutcome::NotFound);
        };
        let version = note.version;
        editor.load_note(note);
        drop(editor);
        tracing::info!("Loaded {} v{} (unsynced: {})", self.key, version, unsynced);
        Ok(LoadOutcome::Loaded { version, unsynced })
    }

    /// Undo on the current page. Fails with [`Error::HistoryBusy`] while
    /// another undo or redo is running.
    pub fn undo(&self) -> Result<bool> {
        let _guard = HistoryGuard::acquire(&self.history_busy)?;
        Ok(self.editor().undo())
    }

    /// Redo on the current page. Fails with [`Error::HistoryBusy`] while
    /// another undo or redo is running.
    pub fn redo(&self) -> Result<bool> {
        let _guard = HistoryGuard::acquire(&self.history_busy)?;
        Ok(self.editor().redo())
    }

    /// Save the current canvas: local cache first, then the server.
    ///
    /// The local write is read back and its stroke count compared before the
    /// note counts as saved. A network failure on the push still leaves the
    /// note saved locally; the reconnect watcher retries it later.
    pub async fn save(&self) -> Result<SaveOutcome> {
        let _serial = self.save_lock.lock().await;

        let (snapshot, generation) = {
            let editor = self.editor();
            (editor.snapshot_note(), editor.generation())
        };

        self.save_locally(&snapshot).await?;
        self.monitor.mark_local_saved();
        self.push(snapshot, generation).await
    }

    /// Push pending changes now, if there are any.
    pub async fn sync_now(&self) -> Result<SaveOutcome> {
        if !self.monitor.has_pending_changes() {
            return Ok(SaveOutcome::NothingToSync);
        }
        self.save().await
    }

    /// Feed device connectivity changes into the session.
    ///
    /// Coming back online with unsynced changes schedules one debounced
    /// [`NoteSession::sync_now`]. Going offline cancels a pending retry. The
    /// watcher stops when the channel closes or the session is dropped.
    pub fn watch_connectivity(self: &Arc<Self>, mut changes: mpsc::Receiver<bool>) -> JoinHandle<()> {
        let session = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(device_online) = changes.recv().await {
                let Some(session) = session.upgrade() else {
                    break;
                };
                if !device_online {
                    session.reconnect.cancel();
                }
                if session.monitor.on_connectivity_changed(device_online).await {
                    session.schedule_resync();
                }
            }
        })
    }

    /// Schedule a re-sync after the reconnect debounce, replacing any pending one.
    pub fn schedule_resync(self: &Arc<Self>) {
        let session = Arc::downgrade(self);
        tracing::debug!(
            "Scheduling re-sync of {} in {:?}",
            self.key,
            self.reconnect_debounce
        );
        self.reconnect.schedule(self.reconnect_debounce, async move {
            let Some(session) = session.upgrade() else {
                return;
            };
            match session.sync_now().await {
                Ok(outcome) => tracing::info!("Re-sync of {} finished: {:?}", session.key, outcome),
                Err(error) => tracing::warn!("Re-sync of {} failed: {}", session.key, error),
            }
        });
    }

    pub fn resync_pending(&self) -> bool {
        self.reconnect.is_pending()
    }

    async fn save_locally(&self, snapshot: &Note) -> Result<()> {
        self.sync.store_local(&self.key, snapshot).await?;

        let expected = snapshot.stroke_count();
        let actual = self
            .sync
            .load_local(&self.key)
            .await?
            .map_or(0, |cached| cached.note.stroke_count());
        if actual != expected {
            tracing::error!(
                "Local save of {} did not verify: wrote {} strokes, read back {}",
                self.key,
                expected,
                actual
            );
            return Err(Error::LocalSaveVerification { expected, actual });
        }
        Ok(())
    }

    async fn push(&self, snapshot: Note, generation: u64) -> Result<SaveOutcome> {
        let mut proposed = snapshot.clone();
        proposed.version = snapshot.version + 1;
        proposed.updated_at = unix_millis_now();

        self.monitor.begin_sync();
        match self.sync.save_note(&self.key, &proposed).await {
            Ok(saved) => {
                self.editor().absorb_saved(&saved, &snapshot, generation);
                self.monitor.sync_succeeded();
                Ok(SaveOutcome::Synced {
                    version: saved.version,
                })
            }
            Err(error) => {
                self.monitor.sync_failed().await;
                if error.is_network() {
                    tracing::warn!("Kept {} locally; server unreachable: {}", self.key, error);
                    Ok(SaveOutcome::SavedLocally)
                } else {
                    Err(error)
                }
            }
        }
    }

    fn editor(&self) -> MutexGuard<'_, CanvasEditor> {
        self.editor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
