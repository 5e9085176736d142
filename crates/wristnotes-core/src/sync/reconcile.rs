//! Replace-all reconciliation of fetched notes into the store.

use std::collections::HashSet;

use crate::db::NoteStore;
use crate::models::NoteRecord;

use super::SyncError;

/// Replace every stored note with `records` and commit once.
///
/// Existing notes are staged for deletion, the new set is staged for
/// insertion, then a single `save` commits both. There is no merge path:
/// notes missing from `records` disappear from the store. When an id occurs
/// more than once the last record wins. Returns the number of distinct ids
/// stored.
pub fn reconcile<S>(records: Vec<NoteRecord>, store: &mut S) -> Result<usize, SyncError>
where
    S: NoteStore + ?Sized,
{
    let existing = store.fetch_all().map_err(SyncError::SaveFailed)?;
    for record in &existing {
        store.delete(record);
    }

    let count = records
        .iter()
        .map(|record| record.id.as_str())
        .collect::<HashSet<_>>()
        .len();
    if count < records.len() {
        tracing::debug!(
            "Fetched {} notes with {} duplicate ids",
            records.len(),
            records.len() - count
        );
    }
    for record in records {
        store.insert(record);
    }

    store.save().map_err(|error| {
        tracing::warn!("Failed to save notes: {}", error);
        SyncError::SaveFailed(error)
    })?;

    tracing::info!("Synced {} notes (replaced {})", count, existing.len());
    Ok(count)
}
