use std::path::Path;

use inksync_core::NoteKey;

use crate::commands::common::{
    format_cached_lines, format_note_details, note_summary, open_cache, read_cached, NoteSummary,
};
use crate::error::CliError;

pub async fn run_list(db_path: &Path, as_json: bool) -> Result<(), CliError> {
    let notes = open_cache(db_path).await?.list().await?;

    if as_json {
        let items = notes
            .iter()
            .map(|cached| note_summary(&cached.note, Some(cached.cached_at)))
            .collect::<Vec<NoteSummary>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if notes.is_empty() {
        println!("No cached notes.");
        return Ok(());
    }
    for line in format_cached_lines(&notes) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_show(key: &NoteKey, db_path: &Path, as_json: bool) -> Result<(), CliError> {
    let cache = open_cache(db_path).await?;
    let cached = read_cached(&cache, key).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&cached.note)?);
    } else {
        for line in format_note_details(&cached.note, Some(cached.cached_at)) {
            println!("{line}");
        }
    }
    Ok(())
}
