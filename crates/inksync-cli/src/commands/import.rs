use std::path::Path;

use inksync_core::store::NoteCache;
use inksync_core::util::normalize_text_option;
use inksync_core::{Note, NoteKey};

use crate::commands::common::open_cache;
use crate::error::CliError;

pub async fn run_import(
    path: &Path,
    book: Option<&str>,
    record: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(path)?;
    let note = parse_note(&raw, book, record)?;
    let key = note.key();

    let cache = open_cache(db_path).await?;
    cache.put_unsynced(&key, &note).await?;
    println!(
        "Imported {key} v{} ({} strokes) into the local cache",
        note.version,
        note.stroke_count()
    );
    Ok(())
}

/// Parse a note file, optionally storing it under another key.
pub fn parse_note(raw: &str, book: Option<&str>, record: Option<&str>) -> Result<Note, CliError> {
    let mut note = serde_json::from_str::<Note>(raw)?;
    if let Some(book) = normalize_text_option(book.map(str::to_string)) {
        note.book_key = book;
    }
    if let Some(record) = normalize_text_option(record.map(str::to_string)) {
        note.record_uuid = record;
    }

    let key = NoteKey::new(note.book_key.trim(), note.record_uuid.trim());
    if key.book_key.is_empty() || key.record_uuid.is_empty() {
        return Err(CliError::EmptyNoteKey);
    }
    note.book_key = key.book_key;
    note.record_uuid = key.record_uuid;
    Ok(note)
}
