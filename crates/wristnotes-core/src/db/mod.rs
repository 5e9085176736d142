//! Local store for mirrored notes

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{NoteStore, SqliteNoteStore};
