use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] inksync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Book key and record UUID cannot be empty")]
    EmptyNoteKey,
    #[error("No cached note for {0}. Run `inksync pull` or `inksync import` first.")]
    NoteNotCached(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Note server is not configured. Run `inksync config set --server-url <URL>` or set INKSYNC_SERVER_URL."
    )]
    ServerNotConfigured,
}
