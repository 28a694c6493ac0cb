//! Canvas editing: eraser, undo log, and editor state

pub mod editor;
pub mod eraser;
pub mod history;

pub use editor::{CanvasEditor, PenStyle};
pub use eraser::{erase_at, EraseResult};
pub use history::{CanvasOperation, OperationLog, MAX_HISTORY};
