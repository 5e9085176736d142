//! Note record model

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::util::first_line_preview;

/// One note mirrored from the Notes application.
///
/// Optional fields are `None` when the source omitted them, and `Some("")`
/// when the source sent an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    /// Identifier assigned by the Notes application (`x-coredata://...`)
    pub id: String,
    pub title: Option<String>,
    /// Raw HTML body as returned by the Notes application
    pub body: Option<String>,
    /// Creation time in the machine's local timezone
    pub created_at: Option<NaiveDateTime>,
    /// Modification time in the machine's local timezone
    pub modified_at: Option<NaiveDateTime>,
    /// Folder name
    pub container: Option<String>,
    /// Owning account name
    pub account: Option<String>,
    pub password_protected: bool,
    pub shared: bool,
    pub attachment_count: u32,
}

impl NoteRecord {
    /// Create a record with only its identifier set
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Title for listings, falling back to the first body line
    #[must_use]
    pub fn display_title(&self, max_len: usize) -> String {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => first_line_preview(title.trim(), max_len),
            _ => first_line_preview(self.body.as_deref().unwrap_or("").trim(), max_len),
        }
    }
}
