//! Vector eraser.
//!
//! Erasing removes the parts of strokes that fall under a circular eraser and
//! keeps the rest as new, shorter strokes. The pass is re-run on every pointer
//! sample against the current stroke list, so its cost is linear in the number
//! of points.

use crate::models::{Stroke, StrokePoint};

/// Outcome of one eraser pass over a stroke list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EraseResult {
    /// Stroke list after the pass, in original order
    pub strokes: Vec<Stroke>,
    /// Original strokes that were split or removed entirely
    pub removed: Vec<Stroke>,
}

impl EraseResult {
    /// Whether the pass touched any stroke.
    pub fn changed(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Erase everything within the eraser footprint centred on `contact`.
///
/// `radius` is the UI slider value; the footprint radius is half of it.
/// Non-positive or non-finite radii erase nothing.
pub fn erase_at(strokes: &[Stroke], contact: StrokePoint, radius: f64) -> EraseResult {
    let Some(radius_squared) = footprint_radius_squared(radius) else {
        return EraseResult {
            strokes: strokes.to_vec(),
            removed: Vec::new(),
        };
    };

    let mut result = EraseResult {
        strokes: Vec::with_capacity(strokes.len()),
        removed: Vec::new(),
    };

    for stroke in strokes {
        match split_stroke(stroke, contact, radius_squared) {
            Some(segments) => {
                result.strokes.extend(segments);
                result.removed.push(stroke.clone());
            }
            None => result.strokes.push(stroke.clone()),
        }
    }

    result
}

/// Split one stroke against the eraser.
///
/// Returns `None` when the stroke is untouched, otherwise the surviving pieces
/// (possibly none).
fn split_stroke(stroke: &Stroke, contact: StrokePoint, radius_squared: f64) -> Option<Vec<Stroke>> {
    let points = &stroke.points;
    let inside = |point: StrokePoint| point.distance_squared(contact) <= radius_squared;

    if points.len() == 1 {
        return inside(points[0]).then(Vec::new);
    }

    let mut segments = Vec::new();
    let mut buffer: Vec<StrokePoint> = Vec::new();
    let mut hit = false;

    for (index, &point) in points.iter().enumerate() {
        if inside(point) {
            hit = true;
            flush(stroke, &mut buffer, &mut segments);
            continue;
        }

        if index > 0 {
            let previous = points[index - 1];
            // Sparse samples can jump over the eraser with both ends outside.
            if !inside(previous) && segment_distance_squared(previous, point, contact) <= radius_squared
            {
                hit = true;
                flush(stroke, &mut buffer, &mut segments);
            }
        }

        buffer.push(point);
    }

    flush(stroke, &mut buffer, &mut segments);
    hit.then_some(segments)
}

fn flush(original: &Stroke, buffer: &mut Vec<StrokePoint>, segments: &mut Vec<Stroke>) {
    if !buffer.is_empty() {
        segments.push(original.derive_segment(std::mem::take(buffer)));
    }
}

fn footprint_radius_squared(radius: f64) -> Option<f64> {
    if !radius.is_finite() || radius <= 0.0 {
        return None;
    }
    let effective = radius / 2.0;
    Some(effective * effective)
}

/// Squared distance from `point` to the closest point of segment `start..end`.
fn segment_distance_squared(start: StrokePoint, end: StrokePoint, point: StrokePoint) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_squared = dx * dx + dy * dy;
    if length_squared < f64::EPSILON {
        return start.distance_squared(point);
    }

    let t = (((point.x - start.x) * dx + (point.y - start.y) * dy) / length_squared).clamp(0.0, 1.0);
    let projection = StrokePoint::new(start.x + t * dx, start.y + t * dy);
    projection.distance_squared(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StrokeId, StrokeType};
    use pretty_assertions::assert_eq;

    fn line(id: &str, xs: &[f64]) -> Stroke {
        Stroke {
            id: Some(StrokeId::from(id)),
            event_uuid: Some("evt-1".to_string()),
            points: xs.iter().map(|&x| StrokePoint::new(x, 0.0)).collect(),
            stroke_width: 3.0,
            color: 0xFF33_66CC,
            stroke_type: StrokeType::Pen,
        }
    }

    #[test]
    fn erasing_far_away_leaves_strokes_unchanged() {
        let strokes = vec![line("a", &[0.0, 10.0, 20.0]), line("b", &[0.0, 5.0])];
        let result = erase_at(&strokes, StrokePoint::new(500.0, 500.0), 10.0);

        assert!(!result.changed());
        assert_eq!(result.strokes, strokes);
    }

    #[test]
    fn large_eraser_removes_whole_stroke() {
        let strokes = vec![line("a", &[0.0, 10.0, 20.0])];
        let result = erase_at(&strokes, StrokePoint::new(10.0, 0.0), 100.0);

        assert!(result.strokes.is_empty());
        assert_eq!(result.removed, strokes);
    }

    #[test]
    fn erasing_midpoint_splits_into_two_strokes() {
        let original = line("a", &[0.0, 10.0, 20.0, 30.0, 40.0]);
        let result = erase_at(&[original.clone()], StrokePoint::new(20.0, 0.0), 4.0);

        assert_eq!(result.strokes.len(), 2);
        let left: Vec<f64> = result.strokes[0].points.iter().map(|p| p.x).collect();
        let right: Vec<f64> = result.strokes[1].points.iter().map(|p| p.x).collect();
        assert_eq!(left, vec![0.0, 10.0]);
        assert_eq!(right, vec![30.0, 40.0]);
        for piece in &result.strokes {
            assert!((piece.stroke_width - original.stroke_width).abs() < f64::EPSILON);
            assert_eq!(piece.color, original.color);
            assert_eq!(piece.event_uuid, original.event_uuid);
            assert_ne!(piece.id, original.id);
        }
    }

    #[test]
    fn segment_crossing_eraser_breaks_sparse_stroke() {
        // Both samples sit outside the footprint but the line between them crosses it.
        let strokes = vec![line("a", &[0.0, 100.0])];
        let result = erase_at(&strokes, StrokePoint::new(50.0, 1.0), 6.0);

        assert!(result.changed());
        assert_eq!(result.strokes.len(), 2);
        assert_eq!(result.strokes[0].points, vec![StrokePoint::new(0.0, 0.0)]);
        assert_eq!(result.strokes[1].points, vec![StrokePoint::new(100.0, 0.0)]);
    }

    #[test]
    fn single_point_stroke_is_all_or_nothing() {
        let dot = line("dot", &[5.0]);
        let missed = erase_at(&[dot.clone()], StrokePoint::new(8.0, 0.0), 4.0);
        assert_eq!(missed.strokes, vec![dot.clone()]);

        let hit = erase_at(&[dot], StrokePoint::new(6.0, 0.0), 4.0);
        assert!(hit.strokes.is_empty());
        assert!(hit.changed());
    }

    #[test]
    fn non_positive_radius_is_noop() {
        let strokes = vec![line("a", &[0.0, 10.0])];
        for radius in [0.0, -4.0, f64::NAN] {
            let result = erase_at(&strokes, StrokePoint::new(0.0, 0.0), radius);
            assert!(!result.changed());
            assert_eq!(result.strokes, strokes);
        }
    }

    #[test]
    fn repeated_passes_work_on_previous_output() {
        let strokes = vec![line("a", &[0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0])];
        let first = erase_at(&strokes, StrokePoint::new(20.0, 0.0), 4.0);
        let second = erase_at(&first.strokes, StrokePoint::new(40.0, 0.0), 4.0);

        assert_eq!(second.strokes.len(), 3);
        assert_eq!(second.removed.len(), 1);
        assert_eq!(second.removed[0], first.strokes[1]);
    }
}
