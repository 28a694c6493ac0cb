//! Connectivity and sync status.
//!
//! The status is advisory: it drives indicators and the automatic re-sync,
//! never the correctness of saves or merges.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::store::HealthCheck;

/// What the user should be told about the current note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncStatus {
    /// Server unreachable
    #[default]
    Offline,
    /// Online with nothing pending
    Synced,
    /// Online with local saves the server has not accepted yet
    HasUnsyncedChanges,
    /// A save to the server is in flight
    Syncing,
}

impl SyncStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Synced => "synced",
            Self::HasUnsyncedChanges => "unsynced changes",
            Self::Syncing => "syncing",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tracks [`SyncStatus`] and decides when a reconnect should trigger a sync.
///
/// Every transition into an online state is confirmed with a real health
/// check; the device's own connectivity flag is only trusted for going offline.
pub struct ConnectivityMonitor {
    health: Arc<dyn HealthCheck>,
    status: watch::Sender<SyncStatus>,
    pending: AtomicBool,
}

impl fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("status", &self.status())
            .field("pending", &self.has_pending_changes())
            .finish_non_exhaustive()
    }
}

impl ConnectivityMonitor {
    pub fn new(health: Arc<dyn HealthCheck>) -> Self {
        let (status, _) = watch::channel(SyncStatus::Offline);
        Self {
            health,
            status,
            pending: AtomicBool::new(false),
        }
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    /// Receive every status change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Check the server and set the initial status.
    pub async fn start(&self) -> SyncStatus {
        let status = if self.health.is_server_reachable().await {
            self.online_status()
        } else {
            SyncStatus::Offline
        };
        self.set(status);
        status
    }

    /// A save reached the local cache.
    pub fn mark_local_saved(&self) {
        self.pending.store(true, Ordering::SeqCst);
        if self.status() != SyncStatus::Offline {
            self.set(SyncStatus::HasUnsyncedChanges);
        }
    }

    pub fn begin_sync(&self) {
        self.set(SyncStatus::Syncing);
    }

    /// The server accepted the pending changes.
    pub fn sync_succeeded(&self) {
        self.pending.store(false, Ordering::SeqCst);
        self.set(SyncStatus::Synced);
    }

    /// A sync attempt failed; find out whether the server is still there.
    pub async fn sync_failed(&self) -> SyncStatus {
        let status = if self.health.is_server_reachable().await {
            SyncStatus::HasUnsyncedChanges
        } else {
            SyncStatus::Offline
        };
        self.set(status);
        status
    }

    /// The device reported a connectivity change.
    ///
    /// Returns true when the note just came back online with pending changes,
    /// which is the caller's cue to schedule a re-sync.
    pub async fn on_connectivity_changed(&self, device_online: bool) -> bool {
        if !device_online {
            self.set(SyncStatus::Offline);
            return false;
        }

        let was_offline = self.status() == SyncStatus::Offline;
        if !self.health.is_server_reachable().await {
            tracing::debug!("Device reports online but the note server is unreachable");
            self.set(SyncStatus::Offline);
            return false;
        }

        self.set(self.online_status());
        was_offline && self.has_pending_changes()
    }

    fn online_status(&self) -> SyncStatus {
        if self.has_pending_changes() {
            SyncStatus::HasUnsyncedChanges
        } else {
            SyncStatus::Synced
        }
    }

    fn set(&self, status: SyncStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            tracing::info!("Sync status: {} -> {}", previous, status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Default)]
    struct SwitchHealth(AtomicBool);

    impl SwitchHealth {
        fn set(&self, reachable: bool) {
            self.0.store(reachable, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl HealthCheck for SwitchHealth {
        async fn is_server_reachable(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn monitor(reachable: bool) -> (Arc<SwitchHealth>, ConnectivityMonitor) {
        let health = Arc::new(SwitchHealth::default());
        health.set(reachable);
        let monitor = ConnectivityMonitor::new(health.clone());
        (health, monitor)
    }

    #[tokio::test]
    async fn start_reflects_health_check() {
        let (_, online) = monitor(true);
        assert_eq!(online.start().await, SyncStatus::Synced);

        let (_, offline) = monitor(false);
        assert_eq!(offline.start().await, SyncStatus::Offline);
    }

    #[tokio::test]
    async fn local_save_while_offline_stays_offline() {
        let (_, monitor) = monitor(false);
        monitor.start().await;
        monitor.mark_local_saved();
        assert_eq!(monitor.status(), SyncStatus::Offline);
        assert!(monitor.has_pending_changes());
    }

    #[tokio::test]
    async fn sync_cycle_transitions() {
        let (health, monitor) = monitor(true);
        let mut updates = monitor.subscribe();
        monitor.start().await;

        monitor.mark_local_saved();
        assert_eq!(monitor.status(), SyncStatus::HasUnsyncedChanges);

        monitor.begin_sync();
        assert_eq!(*updates.borrow_and_update(), SyncStatus::Syncing);

        health.set(false);
        assert_eq!(monitor.sync_failed().await, SyncStatus::Offline);

        health.set(true);
        monitor.begin_sync();
        assert_eq!(monitor.sync_failed().await, SyncStatus::HasUnsyncedChanges);

        monitor.begin_sync();
        monitor.sync_succeeded();
        assert_eq!(monitor.status(), SyncStatus::Synced);
        assert!(!monitor.has_pending_changes());
    }

    #[tokio::test]
    async fn reconnect_with_pending_changes_requests_retry() {
        let (health, monitor) = monitor(false);
        monitor.start().await;
        monitor.mark_local_saved();

        // Device claims to be online but the server is still down.
        assert!(!monitor.on_connectivity_changed(true).await);
        assert_eq!(monitor.status(), SyncStatus::Offline);

        health.set(true);
        assert!(monitor.on_connectivity_changed(true).await);
        assert_eq!(monitor.status(), SyncStatus::HasUnsyncedChanges);

        // Already online: no second retry request.
        assert!(!monitor.on_connectivity_changed(true).await);
    }

    #[tokio::test]
    async fn reconnect_without_pending_changes_just_goes_online() {
        let (health, monitor) = monitor(false);
        monitor.start().await;
        health.set(true);
        assert!(!monitor.on_connectivity_changed(true).await);
        assert_eq!(monitor.status(), SyncStatus::Synced);

        assert!(!monitor.on_connectivity_changed(false).await);
        assert_eq!(monitor.status(), SyncStatus::Offline);
    }

    #[test]
    fn status_labels() {
        assert_eq!(SyncStatus::HasUnsyncedChanges.to_string(), "unsynced changes");
        assert_eq!(SyncStatus::default(), SyncStatus::Offline);
    }
}
