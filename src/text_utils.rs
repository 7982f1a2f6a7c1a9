//! Page text cleanup before it is sent for synthesis.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\u{00A0}]+").unwrap());
static RE_SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([,.;:!?])").unwrap());

/// Join the text runs of a page the way a text layer reads: one space between
/// non-empty runs.
pub fn join_fragments<I, S>(fragments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fragments
        .into_iter()
        .filter(|fragment| !fragment.as_ref().is_empty())
        .map(|fragment| fragment.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// NFC-normalize and collapse whitespace so the request body carries plain
/// running text.
pub fn clean_page_text(text: &str) -> String {
    let normalized: String = text.nfc().collect();
    let collapsed = RE_WHITESPACE.replace_all(&normalized, " ");
    let tightened = RE_SPACE_BEFORE_PUNCT.replace_all(&collapsed, "$1");
    tightened.trim().to_string()
}

/// A page is worth narrating only if it has at least one letter or digit.
pub fn is_speakable(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_non_empty_fragments_with_spaces() {
        let joined = join_fragments(["Chapter", "", "One", "begins"]);
        assert_eq!(joined, "Chapter One begins");
    }

    #[test]
    fn collapses_whitespace_and_punctuation_gaps() {
        let cleaned = clean_page_text("  Hello ,\n\tworld \u{00A0} again .  ");
        assert_eq!(cleaned, "Hello, world again.");
    }

    #[test]
    fn composes_decomposed_characters() {
        let cleaned = clean_page_text("Cafe\u{0301}");
        assert_eq!(cleaned, "Caf\u{00E9}");
    }

    #[test]
    fn punctuation_only_page_is_not_speakable() {
        assert!(!is_speakable(" . - , "));
        assert!(is_speakable("p. 4"));
    }
}
