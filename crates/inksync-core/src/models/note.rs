//! Note model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::stroke::{Page, StrokeId};

/// Stroke ids erased under each originating event, keyed by event id.
///
/// Ordered map so merges and serialization never depend on hash order.
pub type ErasedStrokes = BTreeMap<String, Vec<StrokeId>>;

/// Event key used for erased strokes that carry no originating event.
pub const UNSCOPED_EVENT: &str = "";

/// Identifies the note of one record inside one book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteKey {
    pub book_key: String,
    pub record_uuid: String,
}

impl NoteKey {
    pub fn new(book_key: impl Into<String>, record_uuid: impl Into<String>) -> Self {
        Self {
            book_key: book_key.into(),
            record_uuid: record_uuid.into(),
        }
    }
}

impl fmt::Display for NoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.book_key, self.record_uuid)
    }
}

/// The handwriting record of one person, spanning all pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub book_key: String,
    pub record_uuid: String,
    /// Pages, index 0 is the oldest
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub erased_strokes_by_event: ErasedStrokes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_height: Option<f64>,
    /// Optimistic concurrency token
    #[serde(default)]
    pub version: i64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Note {
    /// Create an empty, never-saved note with a single blank page.
    #[must_use]
    pub fn new(key: &NoteKey) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            book_key: key.book_key.clone(),
            record_uuid: key.record_uuid.clone(),
            pages: vec![Page::default()],
            erased_strokes_by_event: ErasedStrokes::new(),
            canvas_width: None,
            canvas_height: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The key this note is stored under.
    pub fn key(&self) -> NoteKey {
        NoteKey::new(self.book_key.clone(), self.record_uuid.clone())
    }

    /// Total strokes across all pages.
    pub fn stroke_count(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    /// Total erased ids across all events.
    pub fn erased_count(&self) -> usize {
        self.erased_strokes_by_event.values().map(Vec::len).sum()
    }

    /// Check whether no page holds a stroke.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(Page::is_empty)
    }

    /// Copy of this note with point coordinates rescaled to another canvas size.
    ///
    /// Returns an unchanged copy when either size is unknown or not positive.
    #[must_use]
    pub fn scaled_to_canvas(&self, width: f64, height: f64) -> Self {
        let mut scaled = self.clone();
        let (Some(from_width), Some(from_height)) = (self.canvas_width, self.canvas_height) else {
            return scaled;
        };
        if from_width <= 0.0 || from_height <= 0.0 || width <= 0.0 || height <= 0.0 {
            return scaled;
        }

        let scale_x = width / from_width;
        let scale_y = height / from_height;
        for stroke in scaled.pages.iter_mut().flat_map(|page| page.strokes.iter_mut()) {
            for point in &mut stroke.points {
                point.x *= scale_x;
                point.y *= scale_y;
            }
        }
        scaled.canvas_width = Some(width);
        scaled.canvas_height = Some(height);
        scaled
    }
}

/// Add `ids` to `ledger[event]`, skipping ids already present.
pub fn record_erased(ledger: &mut ErasedStrokes, event: &str, ids: impl IntoIterator<Item = StrokeId>) {
    let entry = ledger.entry(event.to_string()).or_default();
    for id in ids {
        if !entry.contains(&id) {
            entry.push(id);
        }
    }
}

/// Remove `ids` from `ledger[event]`, dropping the event once it is empty.
pub fn forget_erased(ledger: &mut ErasedStrokes, event: &str, ids: &[StrokeId]) {
    if let Some(entry) = ledger.get_mut(event) {
        entry.retain(|id| !ids.contains(id));
        if entry.is_empty() {
            ledger.remove(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Stroke, StrokePoint};
    use pretty_assertions::assert_eq;

    fn sample_note() -> Note {
        let key = NoteKey::new("book-1", "record-1");
        let mut note = Note::new(&key);
        note.pages[0].strokes.push(
            Stroke::new(vec![StrokePoint::new(10.0, 20.0), StrokePoint::new(30.0, 40.0)])
                .with_event("evt-1"),
        );
        note.pages.push(Page::default());
        record_erased(
            &mut note.erased_strokes_by_event,
            "evt-1",
            [StrokeId::from("gone-1")],
        );
        note.canvas_width = Some(800.0);
        note.canvas_height = Some(600.0);
        note.version = 4;
        note
    }

    #[test]
    fn test_note_new() {
        let key = NoteKey::new("book", "record");
        let note = Note::new(&key);
        assert_eq!(note.key(), key);
        assert_eq!(note.version, 0);
        assert_eq!(note.pages.len(), 1);
        assert!(note.is_blank());
        assert_eq!(note.created_at, note.updated_at);
    }

    #[test]
    fn test_note_json_roundtrip_keeps_every_field() {
        let note = sample_note();
        let json = serde_json::to_string(&note).unwrap();
        let parsed: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, note);
        assert!(json.contains("erasedStrokesByEvent"));
        assert!(json.contains("canvasWidth"));
    }

    #[test]
    fn test_stroke_and_erased_counts() {
        let note = sample_note();
        assert_eq!(note.stroke_count(), 1);
        assert_eq!(note.erased_count(), 1);
        assert!(!note.is_blank());
    }

    #[test]
    fn test_scaled_to_canvas() {
        let note = sample_note();
        let scaled = note.scaled_to_canvas(400.0, 300.0);
        let point = scaled.pages[0].strokes[0].points[0];
        assert!((point.x - 5.0).abs() < f64::EPSILON);
        assert!((point.y - 10.0).abs() < f64::EPSILON);
        assert_eq!(scaled.canvas_width, Some(400.0));
    }

    #[test]
    fn test_scaled_to_canvas_without_recorded_size_is_identity() {
        let mut note = sample_note();
        note.canvas_width = None;
        assert_eq!(note.scaled_to_canvas(100.0, 100.0), note);
    }

    #[test]
    fn test_record_and_forget_erased() {
        let mut ledger = ErasedStrokes::new();
        record_erased(&mut ledger, "evt", [StrokeId::from("a"), StrokeId::from("a")]);
        assert_eq!(ledger["evt"], vec![StrokeId::from("a")]);

        forget_erased(&mut ledger, "evt", &[StrokeId::from("a")]);
        assert!(ledger.is_empty());
    }
}
