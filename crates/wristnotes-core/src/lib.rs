//! wristnotes-core - Core library for wristnotes
//!
//! This crate mirrors notes from the macOS Notes application into a local
//! `SQLite` store and turns note bodies into renderable blocks. The Notes app
//! has no API, so everything goes through `AppleScript` and a marker-delimited
//! text format (see [`protocol`]).

pub mod bridge;
pub mod config;
pub mod db;
pub mod error;
pub mod markup;
pub mod models;
pub mod protocol;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{BlockKind, DisplayBlock, NoteRecord};
pub use state::{SyncPhase, SyncState};
pub use sync::{SyncError, SyncOutcome, SyncService};
