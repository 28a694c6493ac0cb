//! inksync-core - Core library for inksync
//!
//! This crate contains the stroke model, the vector eraser, the undo log, the
//! conflict merge and the offline-first sync engine shared by the inksync
//! server and CLI.

pub mod cache;
pub mod canvas;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod session;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use models::{Note, NoteKey, Page, Stroke, StrokeId, StrokePoint, StrokeType};
pub use session::{LoadOutcome, NoteSession, SaveOutcome};
pub use state::{ConnectivityMonitor, SyncStatus};
pub use sync::{NoteSyncService, SyncPolicy};
