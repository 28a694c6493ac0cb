//! Error types for inksync-core

use thiserror::Error;

/// Result type alias using inksync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in inksync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure talking to the note server
    #[error("Network failure: {0}")]
    Network(String),

    /// The server rejected a save because the note moved on since it was read
    #[error("Version conflict (server version: {})", display_version(.server_version))]
    VersionConflict {
        /// Server's current version, when the server reported it
        server_version: Option<i64>,
    },

    /// Note or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A sync operation was attempted before its collaborators were wired up
    #[error("Sync service not initialized: {0}")]
    ServiceNotInitialized(&'static str),

    /// Reading back the local cache produced a different stroke count
    #[error("Local save verification failed: expected {expected} strokes, found {actual}")]
    LocalSaveVerification {
        /// Strokes in the snapshot that was written
        expected: usize,
        /// Strokes found when reading the snapshot back
        actual: usize,
    },

    /// Server unreachable and no cached copy to fall back to
    #[error("Cannot load note while offline: {0}")]
    Offline(String),

    /// An undo/redo is already running
    #[error("Another undo/redo operation is in progress")]
    HistoryBusy,

    /// Unexpected response from the note server
    #[error("API error: {0}")]
    Api(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error came from the transport rather than the server's answer.
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Whether this error is a version conflict.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

fn display_version(version: &Option<i64>) -> String {
    version.map_or_else(|| "unknown".to_string(), |version| version.to_string())
}
