use std::env;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use wristnotes_core::config::SyncSettings;
use wristnotes_core::db::{NoteStore, SqliteNoteStore};
use wristnotes_core::protocol::format_timestamp;
use wristnotes_core::NoteRecord;

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "config.json";
const DB_FILE_NAME: &str = "wristnotes.db";

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub folder: Option<String>,
    pub account: Option<String>,
    pub modified_at: Option<String>,
    pub relative_time: Option<String>,
    pub password_protected: bool,
    pub shared: bool,
    pub attachments: u32,
}

pub fn open_store(db_path: &Path) -> Result<SqliteNoteStore, CliError> {
    Ok(SqliteNoteStore::open(db_path)?)
}

pub fn load_settings(config_path: &Path) -> Result<SyncSettings, CliError> {
    Ok(SyncSettings::load_from_path(config_path)?)
}

/// Find a note by exact id, or by a suffix matching exactly one note
pub fn resolve_note(note_query: &str, store: &SqliteNoteStore) -> Result<NoteRecord, CliError> {
    if let Some(note) = store.get(note_query)? {
        return Ok(note);
    }

    let mut matching = store
        .fetch_all()?
        .into_iter()
        .filter(|note| note.id.ends_with(note_query))
        .collect::<Vec<_>>();

    match matching.len() {
        0 => Err(CliError::NoteNotFound(note_query.to_string())),
        1 => Ok(matching.remove(0)),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|note| short_id(&note.id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousNoteId(format!(
                "ID suffix '{note_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn format_note_lines(notes: &[NoteRecord]) -> Vec<String> {
    let now = Local::now().naive_local();
    notes
        .iter()
        .map(|note| {
            let short_id = short_id(&note.id);
            let preview = note_preview(note, 40);
            let folder = note.container.as_deref().unwrap_or("");
            let relative_time = note
                .modified_at
                .map(|modified_at| format_relative_time(modified_at, now))
                .unwrap_or_default();

            format!("{short_id:<8}  {preview:<40}  {folder:<16}  {relative_time}")
        })
        .collect()
}

pub fn note_to_list_item(note: &NoteRecord) -> NoteListItem {
    let now = Local::now().naive_local();

    NoteListItem {
        id: note.id.clone(),
        title: note_preview(note, 80),
        folder: note.container.clone(),
        account: note.account.clone(),
        modified_at: note.modified_at.map(format_timestamp),
        relative_time: note
            .modified_at
            .map(|modified_at| format_relative_time(modified_at, now)),
        password_protected: note.password_protected,
        shared: note.shared,
        attachments: note.attachment_count,
    }
}

/// Last path segment of a Notes id (`x-coredata://.../ICNote/p42` -> `p42`)
pub fn short_id(id: &str) -> String {
    id.rsplit('/').next().unwrap_or(id).to_string()
}

pub fn note_preview(note: &NoteRecord, max_chars: usize) -> String {
    let first_line = note.display_title(usize::MAX);
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(then: NaiveDateTime, now: NaiveDateTime) -> String {
    let diff = (now - then).num_milliseconds().max(0);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("WRISTNOTES_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wristnotes")
        .join(DB_FILE_NAME)
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> PathBuf {
    cli_config_path
        .or_else(|| env::var_os("WRISTNOTES_CONFIG").map(PathBuf::from))
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wristnotes")
        .join(CONFIG_FILE_NAME)
}
