//! Note store implementation

use crate::db::Database;
use crate::error::Result;
use crate::models::NoteRecord;
use rusqlite::{params, OptionalExtension, Row};
use std::path::Path;

const NOTE_COLUMNS: &str = "id, title, body, created_at, modified_at, container, account, \
     password_protected, shared, attachment_count";

/// Keyed record store the sync pipeline writes into.
///
/// `delete` and `insert` only stage changes; nothing is visible to
/// `fetch_all` until `save` succeeds.
pub trait NoteStore {
    /// All committed records
    fn fetch_all(&self) -> Result<Vec<NoteRecord>>;

    /// Stage deletion of a record
    fn delete(&mut self, record: &NoteRecord);

    /// Stage insertion of a record, replacing any record with the same id
    fn insert(&mut self, record: NoteRecord);

    /// Commit every staged change
    fn save(&mut self) -> Result<()>;
}

#[derive(Debug)]
enum PendingChange {
    Delete(String),
    Insert(NoteRecord),
}

/// `SQLite` implementation of `NoteStore`.
///
/// `save` applies all staged changes in a single transaction, so a failed
/// save leaves the previously committed notes untouched. Staged changes are
/// discarded either way.
pub struct SqliteNoteStore {
    db: Database,
    pending: Vec<PendingChange>,
}

impl SqliteNoteStore {
    /// Create a store over an open database
    pub const fn new(db: Database) -> Self {
        Self {
            db,
            pending: Vec::new(),
        }
    }

    /// Open (or create) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Open an in-memory store (primarily for tests)
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Get a committed note by id
    pub fn get(&self, id: &str) -> Result<Option<NoteRecord>> {
        let note = self
            .db
            .connection()
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"),
                params![id],
                Self::parse_note,
            )
            .optional()?;
        Ok(note)
    }

    /// List committed notes, most recently modified first
    pub fn list(&self, limit: usize, offset: usize) -> Result<Vec<NoteRecord>> {
        let mut stmt = self.db.connection().prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes
             ORDER BY modified_at DESC, id ASC
             LIMIT ? OFFSET ?"
        ))?;

        let notes = stmt
            .query_map(
                params![
                    i64::try_from(limit).unwrap_or(i64::MAX),
                    i64::try_from(offset).unwrap_or(i64::MAX)
                ],
                Self::parse_note,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(notes)
    }

    /// Number of committed notes
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .connection()
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Whether there are staged changes not yet saved
    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Parse a note from a database row
    fn parse_note(row: &Row<'_>) -> rusqlite::Result<NoteRecord> {
        Ok(NoteRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            created_at: row.get(3)?,
            modified_at: row.get(4)?,
            container: row.get(5)?,
            account: row.get(6)?,
            password_protected: row.get(7)?,
            shared: row.get(8)?,
            attachment_count: row.get(9)?,
        })
    }
}

impl NoteStore for SqliteNoteStore {
    fn fetch_all(&self) -> Result<Vec<NoteRecord>> {
        self.list(usize::MAX, 0)
    }

    fn delete(&mut self, record: &NoteRecord) {
        self.pending.push(PendingChange::Delete(record.id.clone()));
    }

    fn insert(&mut self, record: NoteRecord) {
        self.pending.push(PendingChange::Insert(record));
    }

    fn save(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(());
        }

        let tx = self.db.connection_mut().transaction()?;
        for change in &pending {
            match change {
                PendingChange::Delete(id) => {
                    tx.execute("DELETE FROM notes WHERE id = ?", params![id])?;
                }
                PendingChange::Insert(note) => {
                    tx.execute(
                        &format!(
                            "INSERT OR REPLACE INTO notes ({NOTE_COLUMNS})
                             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                        ),
                        params![
                            note.id,
                            note.title,
                            note.body,
                            note.created_at,
                            note.modified_at,
                            note.container,
                            note.account,
                            note.password_protected,
                            note.shared,
                            note.attachment_count
                        ],
                    )?;
                }
            }
        }
        tx.commit()?;

        tracing::debug!("Committed {} staged note changes", pending.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn setup() -> SqliteNoteStore {
        SqliteNoteStore::open_in_memory().unwrap()
    }

    fn note(id: &str, day: u32) -> NoteRecord {
        NoteRecord {
            title: Some(format!("Note {id}")),
            body: Some("<div>body</div>".to_string()),
            modified_at: NaiveDate::from_ymd_opt(2025, 6, day)
                .unwrap()
                .and_hms_opt(12, 0, 0),
            container: Some("Notes".to_string()),
            attachment_count: 2,
            shared: true,
            ..NoteRecord::new(id)
        }
    }

    #[test]
    fn test_changes_are_invisible_until_saved() {
        let mut store = setup();
        store.insert(note("a", 1));
        assert!(store.has_pending_changes());
        assert!(store.fetch_all().unwrap().is_empty());

        store.save().unwrap();
        assert!(!store.has_pending_changes());
        assert_eq!(store.fetch_all().unwrap(), vec![note("a", 1)]);
    }

    #[test]
    fn test_get_round_trips_every_column() {
        let mut store = setup();
        let record = NoteRecord {
            created_at: NaiveDate::from_ymd_opt(2024, 12, 31)
                .unwrap()
                .and_hms_opt(23, 59, 59),
            account: Some("iCloud".to_string()),
            password_protected: true,
            ..note("x-coredata://1", 3)
        };
        store.insert(record.clone());
        store.save().unwrap();

        assert_eq!(store.get("x-coredata://1").unwrap(), Some(record));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_list_orders_by_modification_desc() {
        let mut store = setup();
        store.insert(note("old", 1));
        store.insert(note("new", 9));
        store.insert(NoteRecord::new("undated"));
        store.save().unwrap();

        let ids: Vec<String> = store
            .list(10, 0)
            .unwrap()
            .into_iter()
            .map(|note| note.id)
            .collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
        assert_eq!(store.list(1, 1).unwrap()[0].id, "old");
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_delete_then_insert_same_id() {
        let mut store = setup();
        store.insert(note("a", 1));
        store.save().unwrap();

        let existing = store.fetch_all().unwrap();
        for record in &existing {
            store.delete(record);
        }
        store.insert(note("a", 5));
        store.save().unwrap();

        assert_eq!(store.fetch_all().unwrap(), vec![note("a", 5)]);
    }

    #[test]
    fn test_duplicate_ids_last_insert_wins() {
        let mut store = setup();
        store.insert(note("a", 1));
        store.insert(note("a", 2));
        store.save().unwrap();

        assert_eq!(store.fetch_all().unwrap(), vec![note("a", 2)]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("wristnotes.db");
        {
            let mut store = SqliteNoteStore::open(&path).unwrap();
            store.insert(note("kept", 4));
            store.save().unwrap();
        }
        let store = SqliteNoteStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }
}
