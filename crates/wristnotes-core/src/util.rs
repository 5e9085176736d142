//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// First line of `value`, cut to `max_len` characters.
pub fn first_line_preview(value: &str, max_len: usize) -> String {
    value
        .lines()
        .next()
        .unwrap_or("")
        .chars()
        .take(max_len)
        .collect()
}
