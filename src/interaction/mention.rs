//! Mention detection and question extraction.

use crate::base::{prompts::DEFAULT_QUESTION, types::MENTION_TRIGGER};

/// Whether `text` mentions the bot, in any letter case.
pub fn mentions_assistant(text: &str) -> bool {
    text.to_ascii_lowercase().contains(MENTION_TRIGGER)
}

/// Remove every mention of the bot, in any letter case.
pub fn strip_mentions(text: &str) -> String {
    // ASCII lowercasing keeps byte offsets, so matches in `lowered` index `text` directly.
    let lowered = text.to_ascii_lowercase();
    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;

    while let Some(offset) = lowered[cursor..].find(MENTION_TRIGGER) {
        let start = cursor + offset;
        result.push_str(&text[cursor..start]);
        cursor = start + MENTION_TRIGGER.len();
    }

    result.push_str(&text[cursor..]);
    result
}

/// The question to ask the model: the text without mentions, trimmed, or a
/// greeting when nothing is left.
pub fn extract_question(text: &str) -> String {
    let question = strip_mentions(text);
    let question = question.trim();

    if question.is_empty() { DEFAULT_QUESTION.to_string() } else { question.to_string() }
}
