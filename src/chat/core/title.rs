//! Conversation title derivation.

use crate::chat::core::config::TitleConfig;

/// Ellipsis appended to titles cut from long messages.
pub const ELLIPSIS: &str = "...";

/// Derive a conversation title from its first user message.
///
/// Keeps the first `max_words` whitespace-separated words and appends
/// [`ELLIPSIS`] when the trimmed text is longer than `max_chars` characters.
/// The ellipsis depends only on the length of the source text, so a short
/// message with many words is cut without one.
#[must_use]
pub fn derive_title(text: &str, config: &TitleConfig) -> String {
    let text = text.trim();
    let mut title = text
        .split_whitespace()
        .take(config.max_words)
        .collect::<Vec<_>>()
        .join(" ");
    if text.chars().count() > config.max_chars {
        title.push_str(ELLIPSIS);
    }
    title
}
