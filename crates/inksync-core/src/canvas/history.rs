//! Undo/redo operation log for a page's stroke list.

use crate::models::Stroke;

/// Maximum number of operations kept per page.
pub const MAX_HISTORY: usize = 200;

/// A reversible change to a stroke list.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasOperation {
    /// A finished stroke was appended.
    Draw(Stroke),
    /// An erase gesture replaced the list contents.
    Erase {
        before: Vec<Stroke>,
        after: Vec<Stroke>,
    },
    /// The page was cleared.
    Clear(Vec<Stroke>),
}

impl CanvasOperation {
    /// Re-apply the forward effect.
    pub fn apply(&self, strokes: &mut Vec<Stroke>) {
        match self {
            Self::Draw(stroke) => strokes.push(stroke.clone()),
            Self::Erase { after, .. } => after.clone_into(strokes),
            Self::Clear(_) => strokes.clear(),
        }
    }

    /// Undo the forward effect.
    pub fn revert(&self, strokes: &mut Vec<Stroke>) {
        match self {
            Self::Draw(stroke) => {
                if strokes.last() == Some(stroke) {
                    strokes.pop();
                } else if let Some(position) = strokes.iter().rposition(|s| s == stroke) {
                    tracing::warn!("Undo draw found its stroke at {position}, not at the end");
                    strokes.remove(position);
                }
            }
            Self::Erase { before, .. } => before.clone_into(strokes),
            Self::Clear(cleared) => strokes.extend(cleared.iter().cloned()),
        }
    }

    /// Strokes this operation takes off the page when applied forward.
    pub fn removed_strokes(&self) -> Vec<&Stroke> {
        match self {
            Self::Draw(_) => Vec::new(),
            Self::Erase { before, after } => before
                .iter()
                .filter(|stroke| !after.contains(stroke))
                .collect(),
            Self::Clear(cleared) => cleared.iter().collect(),
        }
    }
}

/// Linear undo/redo stacks.
#[derive(Debug, Clone, Default)]
pub struct OperationLog {
    history: Vec<CanvasOperation>,
    redo: Vec<CanvasOperation>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished stroke.
    pub fn record_draw(&mut self, stroke: Stroke) {
        self.push(CanvasOperation::Draw(stroke));
    }

    /// Record an erase gesture. Returns false (and records nothing) when the
    /// gesture did not change the list.
    pub fn record_erase(&mut self, before: Vec<Stroke>, after: Vec<Stroke>) -> bool {
        if before == after {
            return false;
        }
        self.push(CanvasOperation::Erase { before, after });
        true
    }

    /// Record a page clear.
    pub fn record_clear(&mut self, cleared: Vec<Stroke>) {
        self.push(CanvasOperation::Clear(cleared));
    }

    /// Undo the latest operation against `strokes`.
    pub fn undo(&mut self, strokes: &mut Vec<Stroke>) -> Option<&CanvasOperation> {
        let operation = self.history.pop()?;
        operation.revert(strokes);
        self.redo.push(operation);
        self.redo.last()
    }

    /// Redo the latest undone operation against `strokes`.
    pub fn redo(&mut self, strokes: &mut Vec<Stroke>) -> Option<&CanvasOperation> {
        let operation = self.redo.pop()?;
        operation.apply(strokes);
        self.history.push(operation);
        self.history.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Drop both stacks (used when a different note is loaded).
    pub fn reset(&mut self) {
        self.history.clear();
        self.redo.clear();
    }

    fn push(&mut self, operation: CanvasOperation) {
        self.history.push(operation);
        self.redo.clear();
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::eraser::erase_at;
    use crate::models::StrokePoint;
    use pretty_assertions::assert_eq;

    fn stroke(x: f64) -> Stroke {
        Stroke::new(vec![
            StrokePoint::new(x, 0.0),
            StrokePoint::new(x, 10.0),
            StrokePoint::new(x, 20.0),
        ])
    }

    fn draw(log: &mut OperationLog, strokes: &mut Vec<Stroke>, new_stroke: Stroke) {
        strokes.push(new_stroke.clone());
        log.record_draw(new_stroke);
    }

    /// Builds a log of draw, erase and clear operations and returns the final list.
    fn scripted_session() -> (OperationLog, Vec<Stroke>) {
        let mut log = OperationLog::new();
        let mut strokes = Vec::new();

        draw(&mut log, &mut strokes, stroke(0.0));
        draw(&mut log, &mut strokes, stroke(50.0));

        let before = strokes.clone();
        strokes = erase_at(&strokes, StrokePoint::new(0.0, 10.0), 4.0).strokes;
        assert!(log.record_erase(before, strokes.clone()));

        draw(&mut log, &mut strokes, stroke(100.0));

        log.record_clear(std::mem::take(&mut strokes));
        draw(&mut log, &mut strokes, stroke(150.0));
        (log, strokes)
    }

    #[test]
    fn undo_then_redo_restores_every_prefix() {
        let (reference_log, final_strokes) = scripted_session();
        for n in 0..=reference_log.history_len() {
            let mut log = reference_log.clone();
            let mut strokes = final_strokes.clone();
            for _ in 0..n {
                assert!(log.undo(&mut strokes).is_some());
            }
            for _ in 0..n {
                assert!(log.redo(&mut strokes).is_some());
            }
            assert_eq!(strokes, final_strokes, "round trip failed for n = {n}");
        }
    }

    #[test]
    fn undo_walks_back_to_empty() {
        let (mut log, mut strokes) = scripted_session();
        while log.undo(&mut strokes).is_some() {}
        assert!(strokes.is_empty());
        assert!(!log.can_undo());
        assert!(log.can_redo());
    }

    #[test]
    fn new_operation_after_undo_discards_redo() {
        let mut log = OperationLog::new();
        let mut strokes = Vec::new();
        draw(&mut log, &mut strokes, stroke(0.0));
        draw(&mut log, &mut strokes, stroke(10.0));

        log.undo(&mut strokes);
        assert!(log.can_redo());

        draw(&mut log, &mut strokes, stroke(20.0));
        assert!(!log.can_redo());
        assert!(log.redo(&mut strokes).is_none());
        assert_eq!(strokes.len(), 2);
    }

    #[test]
    fn unchanged_erase_is_not_recorded() {
        let mut log = OperationLog::new();
        let strokes = vec![stroke(0.0)];
        assert!(!log.record_erase(strokes.clone(), strokes));
        assert!(!log.can_undo());
    }

    #[test]
    fn undo_on_empty_log_is_noop() {
        let mut log = OperationLog::new();
        let mut strokes = vec![stroke(0.0)];
        assert!(log.undo(&mut strokes).is_none());
        assert_eq!(strokes.len(), 1);
    }

    #[test]
    fn history_is_bounded() {
        let mut log = OperationLog::new();
        let mut strokes = Vec::new();
        for i in 0..(MAX_HISTORY + 5) {
            draw(&mut log, &mut strokes, stroke(f64::from(u32::try_from(i).unwrap())));
        }
        assert_eq!(log.history_len(), MAX_HISTORY);
    }

    #[test]
    fn removed_strokes_reports_erased_originals() {
        let kept = stroke(100.0);
        let erased = stroke(0.0);
        let operation = CanvasOperation::Erase {
            before: vec![erased.clone(), kept.clone()],
            after: vec![kept],
        };
        assert_eq!(operation.removed_strokes(), vec![&erased]);
    }
}
