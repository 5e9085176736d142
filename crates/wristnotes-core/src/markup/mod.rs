//! Line-oriented converter from Notes body HTML to display blocks.
//!
//! This is deliberately not an HTML parser. Notes bodies are a small, regular
//! subset (`<div>` per line, `<h1>`, `<ul>/<li>`, `<br>`), so each line is
//! classified by the tags it contains:
//!
//! - `<ul>` / `</ul>` adjust the list depth; list items on the same line are
//!   emitted at the depth after the opens and before the closes
//! - `<h1>` yields a [`BlockKind::Heading1`]
//! - `<li>` yields a [`BlockKind::ListItem`] indented by three spaces per depth
//! - a line without angle brackets yields a [`BlockKind::Paragraph`]
//!
//! Everything else is dropped. No rule produces headings 2/3, bold or link
//! blocks yet.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{BlockKind, DisplayBlock};

const LIST_OPEN: &str = "<ul>";
const LIST_CLOSE: &str = "</ul>";
const LIST_INDENT: &str = "   ";
const TAB_REPLACEMENT: &str = "    ";

/// Parse a note body into display blocks, in document order.
///
/// Pure and deterministic: the same input always yields the same blocks.
/// Unbalanced `</ul>` tags may drive the depth negative, which simply yields
/// no indentation until enough `<ul>` tags follow.
pub fn parse_blocks(markup: &str) -> Vec<DisplayBlock> {
    let content = markup
        .replace("<div>", "")
        .replace("</div>", "")
        .replace("<br>", "\n");
    let content = content
        .trim()
        .replace("<ul class=\"Apple-dash-list\">", LIST_OPEN);

    let mut blocks = Vec::new();
    let mut depth: i32 = 0;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.contains(LIST_OPEN) || line.contains(LIST_CLOSE) {
            depth += count_tag(line, LIST_OPEN);
            push_list_items(&mut blocks, line, depth);
            depth -= count_tag(line, LIST_CLOSE);
        } else if line.contains("<h1>") {
            if let Some(text) = extract_first(heading_regex(), line) {
                blocks.push(DisplayBlock::new(BlockKind::Heading1, text));
            }
        } else if line.contains("<li>") {
            push_list_items(&mut blocks, line, depth);
        } else if !line.contains('<') && !line.contains('>') {
            let text = clean_text(line);
            if !text.is_empty() {
                blocks.push(DisplayBlock::new(BlockKind::Paragraph, text));
            }
        }
    }

    blocks
}

/// Strip tags, decode the common named entities and normalize whitespace.
///
/// Stray `<` characters are removed after decoding, so `&lt;` does not
/// survive either.
pub fn clean_text(text: &str) -> String {
    let stripped = tag_regex().replace_all(text, "");
    stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace('<', "")
        .replace('\t', TAB_REPLACEMENT)
        .trim()
        .to_string()
}

fn push_list_items(blocks: &mut Vec<DisplayBlock>, line: &str, depth: i32) {
    let indent = LIST_INDENT.repeat(usize::try_from(depth).unwrap_or(0));
    for capture in list_item_regex().captures_iter(line) {
        let text = clean_text(&capture[1]);
        blocks.push(DisplayBlock::new(
            BlockKind::ListItem,
            format!("{indent}{text}"),
        ));
    }
}

fn extract_first(pattern: &Regex, line: &str) -> Option<String> {
    pattern
        .captures(line)
        .map(|capture| clean_text(&capture[1]))
}

fn count_tag(line: &str, tag: &str) -> i32 {
    i32::try_from(line.matches(tag).count()).unwrap_or(i32::MAX)
}

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<h1[^>]*>(.*?)</h1>").expect("Invalid regex"))
}

fn list_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<li[^>]*>(.*?)</li>").expect("Invalid regex"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("Invalid regex"))
}
