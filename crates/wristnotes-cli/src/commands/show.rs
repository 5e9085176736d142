use std::path::Path;

use wristnotes_core::markup::parse_blocks;
use wristnotes_core::protocol::format_timestamp;
use wristnotes_core::{BlockKind, DisplayBlock, NoteRecord};

use crate::commands::common::{normalize_note_identifier, open_store, resolve_note};
use crate::error::CliError;

pub fn run_show(id: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let query = normalize_note_identifier(id)?;
    let store = open_store(db_path)?;
    let note = resolve_note(&query, &store)?;
    let blocks = parse_blocks(note.body.as_deref().unwrap_or(""));

    if as_json {
        println!("{}", serde_json::to_string_pretty(&blocks)?);
        return Ok(());
    }

    for line in format_note_header(&note) {
        println!("{line}");
    }
    println!();
    for line in render_blocks(&blocks) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_note_header(note: &NoteRecord) -> Vec<String> {
    let mut lines = vec![note.display_title(80)];

    let location = match (note.account.as_deref(), note.container.as_deref()) {
        (Some(account), Some(folder)) => format!("{account} / {folder}"),
        (Some(value), None) | (None, Some(value)) => value.to_string(),
        (None, None) => String::new(),
    };
    if !location.is_empty() {
        lines.push(location);
    }
    if let Some(modified_at) = note.modified_at {
        lines.push(format!("Modified {}", format_timestamp(modified_at)));
    }

    let mut flags = Vec::new();
    if note.password_protected {
        flags.push("locked".to_string());
    }
    if note.shared {
        flags.push("shared".to_string());
    }
    if note.attachment_count > 0 {
        flags.push(format!("{} attachments (not synced)", note.attachment_count));
    }
    if !flags.is_empty() {
        lines.push(flags.join(", "));
    }
    lines
}

/// Plain-text rendering of display blocks, one line per block
pub fn render_blocks(blocks: &[DisplayBlock]) -> Vec<String> {
    blocks
        .iter()
        .map(|block| match block.kind {
            BlockKind::Heading1 => format!("# {}", block.text),
            BlockKind::Heading2 => format!("## {}", block.text),
            BlockKind::Heading3 => format!("### {}", block.text),
            BlockKind::Paragraph => block.text.clone(),
            BlockKind::ListItem => {
                let text = block.text.trim_start_matches(' ');
                let indent = &block.text[..block.text.len() - text.len()];
                format!("{indent}• {text}")
            }
            BlockKind::Bold => format!("**{}**", block.text),
            BlockKind::Link => format!("<{}>", block.text),
        })
        .collect()
}
