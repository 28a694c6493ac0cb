//! In-memory editing state of one note.

use crate::error::{Error, Result};
use crate::models::{
    forget_erased, record_erased, ErasedStrokes, Note, NoteKey, Page, Stroke, StrokeId,
    StrokePoint, StrokeType, UNSCOPED_EVENT,
};
use crate::sync::merge::{drop_erased_strokes, merge_note_pages};

use super::eraser::erase_at;
use super::history::{CanvasOperation, OperationLog};

/// Pen settings applied to strokes started with [`CanvasEditor::begin_stroke`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenStyle {
    pub stroke_width: f64,
    pub color: u32,
    pub stroke_type: StrokeType,
}

impl Default for PenStyle {
    fn default() -> Self {
        Self {
            stroke_width: crate::models::DEFAULT_STROKE_WIDTH,
            color: crate::models::DEFAULT_COLOR,
            stroke_type: StrokeType::Pen,
        }
    }
}

/// Pages, undo logs and erase ledger of the note being edited.
///
/// Every local mutation bumps [`CanvasEditor::generation`], which async
/// callers compare to detect that the canvas changed while they were waiting.
#[derive(Debug, Clone)]
pub struct CanvasEditor {
    key: NoteKey,
    pages: Vec<Page>,
    logs: Vec<OperationLog>,
    current_page: usize,
    event_uuid: Option<String>,
    active_stroke: Option<Stroke>,
    erase_before: Option<Vec<Stroke>>,
    erased: ErasedStrokes,
    version: i64,
    created_at: i64,
    updated_at: i64,
    canvas_width: Option<f64>,
    canvas_height: Option<f64>,
    generation: u64,
}

impl CanvasEditor {
    /// Start editing a blank, never-saved note.
    pub fn new(key: NoteKey) -> Self {
        let note = Note::new(&key);
        Self::from_note(note)
    }

    /// Start editing an existing note.
    pub fn from_note(note: Note) -> Self {
        let mut editor = Self {
            key: note.key(),
            pages: Vec::new(),
            logs: Vec::new(),
            current_page: 0,
            event_uuid: None,
            active_stroke: None,
            erase_before: None,
            erased: ErasedStrokes::new(),
            version: 0,
            created_at: note.created_at,
            updated_at: note.updated_at,
            canvas_width: None,
            canvas_height: None,
            generation: 0,
        };
        editor.replace_contents(note);
        editor
    }

    pub const fn key(&self) -> &NoteKey {
        &self.key
    }

    /// Local edit generation counter.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Last version confirmed by the server (0 when never saved).
    pub const fn version(&self) -> i64 {
        self.version
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub const fn current_page_index(&self) -> usize {
        self.current_page
    }

    /// Strokes of the page being edited.
    pub fn strokes(&self) -> &[Stroke] {
        &self.pages[self.current_page].strokes
    }

    /// The stroke currently being drawn, if any.
    pub const fn active_stroke(&self) -> Option<&Stroke> {
        self.active_stroke.as_ref()
    }

    pub const fn erased_strokes(&self) -> &ErasedStrokes {
        &self.erased
    }

    /// Event new strokes are attributed to.
    pub fn set_event(&mut self, event_uuid: Option<String>) {
        self.event_uuid = event_uuid;
    }

    /// Record the canvas size the note is drawn on.
    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.canvas_width = Some(width);
        self.canvas_height = Some(height);
    }

    pub fn can_undo(&self) -> bool {
        self.logs[self.current_page].can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.logs[self.current_page].can_redo()
    }

    /// Pointer down with the pen: start a new stroke.
    pub fn begin_stroke(&mut self, point: StrokePoint, style: PenStyle) {
        let mut stroke = Stroke::new(vec![point]).with_style(
            style.stroke_width,
            style.color,
            style.stroke_type,
        );
        stroke.event_uuid.clone_from(&self.event_uuid);
        self.active_stroke = Some(stroke);
    }

    /// Pointer move with the pen.
    pub fn extend_stroke(&mut self, point: StrokePoint) {
        if let Some(stroke) = self.active_stroke.as_mut() {
            stroke.add_point(point);
        }
    }

    /// Pointer up: commit the active stroke to the page.
    pub fn end_stroke(&mut self) -> Option<&Stroke> {
        let stroke = self.active_stroke.take().filter(|stroke| !stroke.is_empty())?;
        let page = self.current_page;
        self.pages[page].strokes.push(stroke.clone());
        self.logs[page].record_draw(stroke);
        self.bump();
        self.pages[page].strokes.last()
    }

    /// Pointer down with the eraser.
    pub fn begin_erase(&mut self) {
        self.erase_before = Some(self.strokes().to_vec());
    }

    /// One eraser sample. Returns whether the page changed.
    pub fn erase_at(&mut self, point: StrokePoint, radius: f64) -> bool {
        if self.erase_before.is_none() {
            self.begin_erase();
        }
        let page = self.current_page;
        let result = erase_at(&self.pages[page].strokes, point, radius);
        if !result.changed() {
            return false;
        }
        self.pages[page].strokes = result.strokes;
        self.bump();
        true
    }

    /// Pointer up with the eraser: log the whole gesture as one operation.
    pub fn end_erase(&mut self) -> bool {
        let Some(before) = self.erase_before.take() else {
            return false;
        };
        let page = self.current_page;
        let after = self.pages[page].strokes.clone();
        let removed = removed_by_id(&before, &after);
        if !self.logs[page].record_erase(before, after) {
            return false;
        }
        self.record_in_ledger(removed.iter());
        true
    }

    /// Remove every stroke from the current page.
    pub fn clear_page(&mut self) -> bool {
        let page = self.current_page;
        if self.pages[page].is_empty() {
            return false;
        }
        let cleared = std::mem::take(&mut self.pages[page].strokes);
        self.record_in_ledger(cleared.iter());
        self.logs[page].record_clear(cleared);
        self.bump();
        true
    }

    /// Undo on the current page. Returns whether anything was undone.
    pub fn undo(&mut self) -> bool {
        let page = self.current_page;
        let Some(operation) = self.logs[page].undo(&mut self.pages[page].strokes) else {
            return false;
        };
        let restored = ledger_entries(operation, self.event_uuid.as_deref());
        for (event, id) in restored {
            forget_erased(&mut self.erased, &event, &[id]);
        }
        self.bump();
        true
    }

    /// Redo on the current page. Returns whether anything was redone.
    pub fn redo(&mut self) -> bool {
        let page = self.current_page;
        let Some(operation) = self.logs[page].redo(&mut self.pages[page].strokes) else {
            return false;
        };
        let erased_again = ledger_entries(operation, self.event_uuid.as_deref());
        for (event, id) in erased_again {
            record_erased(&mut self.erased, &event, [id]);
        }
        self.bump();
        true
    }

    /// Append a blank page and make it current.
    pub fn add_page(&mut self) -> usize {
        self.pages.push(Page::default());
        self.logs.push(OperationLog::new());
        self.current_page = self.pages.len() - 1;
        self.bump();
        self.current_page
    }

    /// Switch the page being edited.
    pub fn select_page(&mut self, index: usize) -> Result<()> {
        if index >= self.pages.len() {
            return Err(Error::InvalidInput(format!(
                "page {index} does not exist ({} pages)",
                self.pages.len()
            )));
        }
        self.active_stroke = None;
        self.erase_before = None;
        self.current_page = index;
        Ok(())
    }

    /// Copy of the committed state as a note (in-progress strokes excluded).
    pub fn snapshot_note(&self) -> Note {
        Note {
            book_key: self.key.book_key.clone(),
            record_uuid: self.key.record_uuid.clone(),
            pages: self.pages.clone(),
            erased_strokes_by_event: self.erased.clone(),
            canvas_width: self.canvas_width,
            canvas_height: self.canvas_height,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Replace the whole editing state with `note`, dropping undo history.
    ///
    /// The editor keeps its own key, so a note found under another book (a
    /// moved record) is saved back under the key being edited. Counts as an
    /// edit: the generation moves, so loads already in flight are discarded.
    pub fn load_note(&mut self, note: Note) {
        self.replace_contents(note);
        self.bump();
    }

    fn replace_contents(&mut self, note: Note) {
        let mut pages = note.pages;
        if pages.is_empty() {
            pages.push(Page::default());
        }
        self.logs = vec![OperationLog::new(); pages.len()];
        self.pages = pages;
        self.current_page = self.current_page.min(self.pages.len() - 1);
        self.active_stroke = None;
        self.erase_before = None;
        self.erased = note.erased_strokes_by_event;
        self.version = note.version;
        self.created_at = note.created_at;
        self.updated_at = note.updated_at;
        self.canvas_width = note.canvas_width.or(self.canvas_width);
        self.canvas_height = note.canvas_height.or(self.canvas_height);
    }

    /// Fold the server's answer to a save back into the editor.
    ///
    /// `snapshot` is what was sent and `snapshot_generation` the generation it
    /// was taken at. When the server kept exactly the sent pages only the
    /// version metadata moves. When the save went through a merge, the merged
    /// pages replace the local ones if nothing was edited meanwhile; otherwise
    /// they are merged again with the newer local pages. Either way strokes in
    /// the erase ledger stay off the pages, and undo history is dropped.
    pub fn absorb_saved(&mut self, saved: &Note, snapshot: &Note, snapshot_generation: u64) {
        self.version = saved.version;
        self.created_at = saved.created_at;
        self.updated_at = saved.updated_at;

        if saved.pages == snapshot.pages {
            for (event, ids) in &saved.erased_strokes_by_event {
                record_erased(&mut self.erased, event, ids.iter().cloned());
            }
            return;
        }

        if self.generation == snapshot_generation {
            tracing::debug!("Adopting merged note {} v{}", self.key, saved.version);
            let current = self.current_page;
            let local_erased = std::mem::take(&mut self.erased);
            self.load_note(saved.clone());
            for (event, ids) in local_erased {
                record_erased(&mut self.erased, &event, ids);
            }
            drop_erased_strokes(&mut self.pages, &self.erased);
            self.current_page = current.min(self.pages.len() - 1);
            return;
        }

        tracing::debug!(
            "Note {} changed during save; merging server result into newer local pages",
            self.key
        );
        for (event, ids) in &saved.erased_strokes_by_event {
            record_erased(&mut self.erased, event, ids.iter().cloned());
        }
        let mut pages = merge_note_pages(&saved.pages, &self.pages);
        drop_erased_strokes(&mut pages, &self.erased);
        self.logs = vec![OperationLog::new(); pages.len()];
        self.pages = pages;
        self.current_page = self.current_page.min(self.pages.len() - 1);
        self.erase_before = None;
        self.bump();
    }

    fn record_in_ledger<'a>(&mut self, strokes: impl Iterator<Item = &'a Stroke>) {
        for stroke in strokes {
            let Some(id) = stroke.id.clone() else {
                continue;
            };
            let event = ledger_event(stroke, self.event_uuid.as_deref());
            record_erased(&mut self.erased, &event, [id]);
        }
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Strokes of `before` whose id no longer appears in `after`.
fn removed_by_id(before: &[Stroke], after: &[Stroke]) -> Vec<Stroke> {
    before
        .iter()
        .filter(|stroke| {
            stroke.id.as_ref().is_some_and(|id| {
                !after
                    .iter()
                    .any(|survivor| survivor.id.as_ref() == Some(id))
            })
        })
        .cloned()
        .collect()
}

/// Event a removed stroke is filed under in the erase ledger.
fn ledger_event(stroke: &Stroke, session_event: Option<&str>) -> String {
    stroke
        .event_uuid
        .as_deref()
        .or(session_event)
        .unwrap_or(UNSCOPED_EVENT)
        .to_string()
}

/// Ledger entries an operation adds when applied forward.
fn ledger_entries(
    operation: &CanvasOperation,
    session_event: Option<&str>,
) -> Vec<(String, StrokeId)> {
    operation
        .removed_strokes()
        .into_iter()
        .filter_map(|stroke| Some((ledger_event(stroke, session_event), stroke.id.clone()?)))
        .collect()
}
