//! Conflict merge of divergent note copies.
//!
//! Strokes are matched by id. On a collision the local copy wins, strokes only
//! the server knows about are kept, and strokes without an id are always
//! treated as new local work. Every function here is deterministic in its
//! inputs.

use std::collections::{HashMap, HashSet};

use crate::models::{ErasedStrokes, Note, Page, Stroke, StrokeId};

/// Merge two page lists index by index.
///
/// A page missing on one side counts as empty.
pub fn merge_note_pages(server: &[Page], local: &[Page]) -> Vec<Page> {
    let empty = Page::default();
    (0..server.len().max(local.len()))
        .map(|index| {
            merge_page(
                server.get(index).unwrap_or(&empty),
                local.get(index).unwrap_or(&empty),
            )
        })
        .collect()
}

/// Merge one page's strokes.
///
/// Output order: server strokes in server order (with local replacements),
/// then local strokes whose id the server lacks, then id-less local strokes,
/// both in local order.
pub fn merge_page(server: &Page, local: &Page) -> Page {
    let local_by_id: HashMap<&StrokeId, &Stroke> = local
        .strokes
        .iter()
        .filter_map(|stroke| stroke.id.as_ref().map(|id| (id, stroke)))
        .collect();

    let mut merged = Vec::with_capacity(server.len().max(local.len()));
    let mut placed: HashSet<&StrokeId> = HashSet::new();

    for stroke in &server.strokes {
        match stroke.id.as_ref() {
            Some(id) => {
                if !placed.insert(id) {
                    continue;
                }
                let winner = local_by_id.get(id).copied().unwrap_or(stroke);
                merged.push(winner.clone());
            }
            // Server strokes always carry ids; keep a stray one as is.
            None => merged.push(stroke.clone()),
        }
    }

    for stroke in &local.strokes {
        if let Some(id) = stroke.id.as_ref() {
            if placed.insert(id) {
                merged.push(stroke.clone());
            }
        }
    }

    merged.extend(local.strokes.iter().filter(|stroke| stroke.id.is_none()).cloned());

    Page::new(merged)
}

/// Union of two erase ledgers, per event.
///
/// Server ids keep their order; local ids the server lacks are appended.
pub fn merge_erased_strokes(server: &ErasedStrokes, local: &ErasedStrokes) -> ErasedStrokes {
    let mut merged = ErasedStrokes::new();
    for (event, ids) in server.iter().chain(local.iter()) {
        let entry: &mut Vec<StrokeId> = merged.entry(event.clone()).or_default();
        for id in ids {
            if !entry.contains(id) {
                entry.push(id.clone());
            }
        }
    }
    merged
}

/// Build the note to re-submit after a version conflict.
///
/// `reported_version` is the server version carried by the conflict, when
/// known. The result's version is one above every version seen so that the
/// server's `current + 1` rule accepts it.
pub fn merge_notes(server: &Note, local: &Note, reported_version: Option<i64>, now: i64) -> Note {
    let base_version = server
        .version
        .max(reported_version.unwrap_or(i64::MIN))
        .max(local.version);

    Note {
        book_key: local.book_key.clone(),
        record_uuid: local.record_uuid.clone(),
        pages: merge_note_pages(&server.pages, &local.pages),
        erased_strokes_by_event: merge_erased_strokes(
            &server.erased_strokes_by_event,
            &local.erased_strokes_by_event,
        ),
        canvas_width: local.canvas_width.or(server.canvas_width),
        canvas_height: local.canvas_height.or(server.canvas_height),
        version: base_version.saturating_add(1),
        created_at: if server.created_at > 0 {
            server.created_at
        } else {
            local.created_at
        },
        updated_at: now,
    }
}

/// Take every stroke whose id is in `erased` off the pages.
///
/// A merge re-adds a server stroke that was erased locally when only its
/// split pieces survive locally; the ledger is what says it is gone.
pub fn drop_erased_strokes(pages: &mut [Page], erased: &ErasedStrokes) {
    let erased: HashSet<&StrokeId> = erased.values().flatten().collect();
    if erased.is_empty() {
        return;
    }
    for page in pages {
        page.strokes
            .retain(|stroke| !stroke.id.as_ref().is_some_and(|id| erased.contains(id)));
    }
}

/// Replay unsynced local work on top of a newer server copy.
///
/// The result keeps the server version as its base, so the next push proposes
/// `server.version + 1`. When the server is not ahead of `local` there is
/// nothing to fold in and `local` comes back unchanged.
pub fn rebase_note(server: &Note, local: &Note) -> Note {
    if server.version <= local.version {
        return local.clone();
    }
    let mut rebased = merge_notes(server, local, None, local.updated_at);
    rebased.version = server.version;
    drop_erased_strokes(&mut rebased.pages, &rebased.erased_strokes_by_event);
    rebased
}
