use std::path::Path;

use inksync_core::{LoadOutcome, NoteKey, SyncConfig, SyncStatus};

use crate::commands::common::SyncContext;
use crate::error::CliError;

pub async fn run_pull(
    key: &NoteKey,
    force_refresh: bool,
    config: &SyncConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    let context = SyncContext::open(config, db_path).await?;
    let status = context.monitor.start().await;
    let session = context.session(key.clone());

    match session.load(force_refresh).await? {
        LoadOutcome::Loaded { version, unsynced } => {
            let strokes = session.snapshot().stroke_count();
            if status == SyncStatus::Offline {
                println!("Server unreachable; using cached {key} v{version} ({strokes} strokes)");
            } else {
                println!("Pulled {key} v{version} ({strokes} strokes)");
            }
            if unsynced {
                println!("Local changes to {key} are not on the server yet; run `inksync push`");
            }
        }
        LoadOutcome::NotFound => println!("No note for {key} on the server or in the cache"),
        LoadOutcome::Stale => println!("Pull of {key} was superseded by a local edit"),
    }
    Ok(())
}
