//! Marker-delimited text format returned by the Notes fetch script.
//!
//! The payload is a run of blocks, one per note:
//!
//! ```text
//! ---START---
//! ID: x-coredata://.../ICNote/p42
//! Name: Groceries
//! Body: <div>Milk</div>
//! <div>Eggs</div>
//! Created: Tuesday 3 June 2025 at 09:00:00
//! ...
//! ---END---
//! ```
//!
//! Field boundaries are prefix based: a line starting with a known label
//! (`Label: `) closes the previous field, any other line is appended to it.
//! A body line that happens to start with e.g. `Shared: ` therefore cuts the
//! body short. This is a limitation of the upstream text format and is kept
//! as-is so parsing stays predictable.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::models::NoteRecord;

/// Literal line opening a note block
pub const START_MARKER: &str = "---START---";
/// Literal line closing a note block
pub const END_MARKER: &str = "---END---";
/// `AppleScript` date rendering in the `en_US` locale,
/// e.g. `Tuesday 3 June 2025 at 14:05:00`
pub const TIMESTAMP_FORMAT: &str = "%A %-d %B %Y at %H:%M:%S";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Field {
    Id,
    Name,
    Body,
    Created,
    Modified,
    Container,
    Account,
    PasswordProtected,
    Shared,
    Attachments,
}

impl Field {
    const ALL: [Self; 10] = [
        Self::Id,
        Self::Name,
        Self::Body,
        Self::Created,
        Self::Modified,
        Self::Container,
        Self::Account,
        Self::PasswordProtected,
        Self::Shared,
        Self::Attachments,
    ];

    const fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Name => "Name",
            Self::Body => "Body",
            Self::Created => "Created",
            Self::Modified => "Modified",
            Self::Container => "Container",
            Self::Account => "Account",
            Self::PasswordProtected => "Password Protected",
            Self::Shared => "Shared",
            Self::Attachments => "Attachments",
        }
    }

    /// Match `Label: value` at the start of a line; the space is required
    fn match_line(line: &str) -> Option<(Self, &str)> {
        Self::ALL.iter().find_map(|&field| {
            line.strip_prefix(field.label())?
                .strip_prefix(": ")
                .map(|value| (field, value))
        })
    }
}

/// Decode a fetch payload into note records.
///
/// Values are kept as sent after the `Label: ` prefix, including any
/// surrounding spaces; only blank lines trailing a multi-line value are
/// dropped. Blocks without a non-blank `ID` are dropped. Every other field is
/// filled in best-effort: unparsable dates become `None`, unparsable
/// attachment counts become `0`, and flags are only `true` for the literal
/// `true`.
pub fn parse_notes(payload: &str) -> Vec<NoteRecord> {
    let blocks = payload.split(START_MARKER).skip(1);
    let mut records = Vec::new();
    for (index, block) in blocks.enumerate() {
        match parse_block(block) {
            Some(record) => records.push(record),
            None => tracing::debug!("Skipping note block {} without an ID", index + 1),
        }
    }
    records
}

/// Encode records in the same format the fetch script emits.
///
/// `None` fields are left out so that decoding yields `None` again. Trailing
/// line breaks inside a value do not survive decoding.
pub fn encode_notes(records: &[NoteRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(START_MARKER);
        out.push('\n');
        push_field(&mut out, Field::Id, &record.id);
        if let Some(title) = &record.title {
            push_field(&mut out, Field::Name, title);
        }
        if let Some(body) = &record.body {
            push_field(&mut out, Field::Body, body);
        }
        if let Some(created_at) = record.created_at {
            push_field(&mut out, Field::Created, &format_timestamp(created_at));
        }
        if let Some(modified_at) = record.modified_at {
            push_field(&mut out, Field::Modified, &format_timestamp(modified_at));
        }
        if let Some(container) = &record.container {
            push_field(&mut out, Field::Container, container);
        }
        if let Some(account) = &record.account {
            push_field(&mut out, Field::Account, account);
        }
        push_field(
            &mut out,
            Field::PasswordProtected,
            &record.password_protected.to_string(),
        );
        push_field(&mut out, Field::Shared, &record.shared.to_string());
        push_field(
            &mut out,
            Field::Attachments,
            &record.attachment_count.to_string(),
        );
        out.push_str(END_MARKER);
        out.push('\n');
    }
    out
}

/// Parse a timestamp in [`TIMESTAMP_FORMAT`]; no other format is attempted.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok()
}

/// Render a timestamp in [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn push_field(out: &mut String, field: Field, value: &str) {
    let _ = writeln!(out, "{}: {}", field.label(), value);
}

fn parse_block(block: &str) -> Option<NoteRecord> {
    let mut fields: HashMap<Field, String> = HashMap::new();
    let mut current: Option<(Field, Vec<&str>)> = None;

    for line in block.lines() {
        if line.starts_with(END_MARKER) {
            break;
        }
        if let Some((field, value)) = Field::match_line(line) {
            flush_field(&mut fields, current.take());
            current = Some((field, vec![value]));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }
    flush_field(&mut fields, current);

    let id = fields.remove(&Field::Id).filter(|id| !id.trim().is_empty())?;
    let timestamp = |field: Field| fields.get(&field).and_then(|value| parse_timestamp(value));
    let flag = |field: Field| {
        fields
            .get(&field)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    };

    Some(NoteRecord {
        created_at: timestamp(Field::Created),
        modified_at: timestamp(Field::Modified),
        password_protected: flag(Field::PasswordProtected),
        shared: flag(Field::Shared),
        attachment_count: fields
            .get(&Field::Attachments)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0),
        title: fields.remove(&Field::Name),
        body: fields.remove(&Field::Body),
        container: fields.remove(&Field::Container),
        account: fields.remove(&Field::Account),
        id,
    })
}

fn flush_field(fields: &mut HashMap<Field, String>, current: Option<(Field, Vec<&str>)>) {
    if let Some((field, mut lines)) = current {
        while lines.len() > 1 && lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        fields.insert(field, lines.join("\n"));
    }
}
