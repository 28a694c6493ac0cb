//! Local libSQL database holding the note cache

mod connection;
mod migrations;

pub use connection::Database;
