use std::path::Path;

use inksync_core::{NoteKey, SaveOutcome, SyncConfig};

use crate::commands::common::SyncContext;
use crate::error::CliError;

/// Push the cached copy of `key`, merging with the server copy on conflict.
pub async fn run_push(key: &NoteKey, config: &SyncConfig, db_path: &Path) -> Result<(), CliError> {
    let context = SyncContext::open(config, db_path).await?;
    let outcome = push_cached(&context, key).await?;

    match outcome {
        SaveOutcome::Synced { version } => println!("Pushed {key} as v{version}"),
        SaveOutcome::SavedLocally => {
            println!("Server unreachable; {key} stays in the local cache until the next push");
        }
        SaveOutcome::NothingToSync => println!("Nothing to push for {key}"),
    }
    Ok(())
}

pub async fn push_cached(context: &SyncContext, key: &NoteKey) -> Result<SaveOutcome, CliError> {
    let cached = context
        .service
        .load_local(key)
        .await?
        .ok_or_else(|| CliError::NoteNotCached(key.to_string()))?;

    context.monitor.start().await;
    let session = context.session(key.clone());
    session.with_editor(|editor| editor.load_note(cached.note));
    Ok(session.save().await?)
}
