//! Local note caches

mod memory;
mod sqlite;

pub use memory::MemoryNoteCache;
pub use sqlite::SqliteNoteCache;
