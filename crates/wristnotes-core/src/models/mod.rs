//! Data models for wristnotes

mod block;
mod note;

pub use block::{BlockKind, DisplayBlock};
pub use note::NoteRecord;
