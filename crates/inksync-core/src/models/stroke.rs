//! Stroke and page model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default pen width in canvas units.
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

/// Opaque black in ARGB.
pub const DEFAULT_COLOR: u32 = 0xFF00_0000;

/// Stable identifier of a stroke, shared across devices.
///
/// Fresh ids are UUID v7 strings; ids coming from the server are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeId(String);

impl StrokeId {
    /// Create a new unique stroke ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StrokeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StrokeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for StrokeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A point in canvas-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
}

impl StrokePoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point.
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Pen or highlighter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeType {
    #[default]
    Pen,
    Highlighter,
}

/// One continuous pen or highlighter gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    /// Stable id; strokes without one never match during a merge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StrokeId>,
    /// Calendar event the stroke was drawn under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_uuid: Option<String>,
    pub points: Vec<StrokePoint>,
    pub stroke_width: f64,
    pub color: u32,
    #[serde(default)]
    pub stroke_type: StrokeType,
}

impl Stroke {
    /// Create a new pen stroke with a fresh id and default style.
    #[must_use]
    pub fn new(points: Vec<StrokePoint>) -> Self {
        Self {
            id: Some(StrokeId::new()),
            event_uuid: None,
            points,
            stroke_width: DEFAULT_STROKE_WIDTH,
            color: DEFAULT_COLOR,
            stroke_type: StrokeType::Pen,
        }
    }

    /// Attach the originating event.
    #[must_use]
    pub fn with_event(mut self, event_uuid: impl Into<String>) -> Self {
        self.event_uuid = Some(event_uuid.into());
        self
    }

    /// Override the style attributes.
    #[must_use]
    pub const fn with_style(mut self, stroke_width: f64, color: u32, stroke_type: StrokeType) -> Self {
        self.stroke_width = stroke_width;
        self.color = color;
        self.stroke_type = stroke_type;
        self
    }

    /// Build a stroke that shares this stroke's style and event but owns new points.
    ///
    /// Used for eraser splits: each surviving piece gets a fresh id.
    #[must_use]
    pub fn derive_segment(&self, points: Vec<StrokePoint>) -> Self {
        Self {
            id: Some(StrokeId::new()),
            event_uuid: self.event_uuid.clone(),
            points,
            stroke_width: self.stroke_width,
            color: self.color,
            stroke_type: self.stroke_type,
        }
    }

    /// Append a point while the pointer is still down.
    pub fn add_point(&mut self, point: StrokePoint) {
        self.points.push(point);
    }

    /// Get the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the stroke has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One canvas surface's worth of strokes, in drawing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Page {
    pub strokes: Vec<Stroke>,
}

impl Page {
    pub const fn new(strokes: Vec<Stroke>) -> Self {
        Self { strokes }
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Strokes in paint order: highlighters first so pen ink stays on top.
    pub fn render_order(&self) -> impl Iterator<Item = &Stroke> {
        let highlighters = self
            .strokes
            .iter()
            .filter(|stroke| stroke.stroke_type == StrokeType::Highlighter);
        let pens = self
            .strokes
            .iter()
            .filter(|stroke| stroke.stroke_type == StrokeType::Pen);
        highlighters.chain(pens)
    }
}

impl From<Vec<Stroke>> for Page {
    fn from(strokes: Vec<Stroke>) -> Self {
        Self { strokes }
    }
}
