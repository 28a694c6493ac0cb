//! Data models for inksync

mod note;
mod stroke;

pub use note::{forget_erased, record_erased, ErasedStrokes, Note, NoteKey, UNSCOPED_EVENT};
pub use stroke::{
    Page, Stroke, StrokeId, StrokePoint, StrokeType, DEFAULT_COLOR, DEFAULT_STROKE_WIDTH,
};
