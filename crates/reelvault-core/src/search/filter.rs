//! Conversational filler that never reaches scoring.

use once_cell::sync::Lazy;
use regex::Regex;

const FILLER_WORDS: &[&str] = &[
    "hi", "hello", "hey", "hii", "helo", "thanks", "thank", "thx", "thnx", "ok", "okay", "k",
    "yes", "no", "yup", "nope", "good", "bad", "nice", "cool", "how", "what", "when", "where",
    "why", "please", "pls", "plz", "send", "give", "want", "need", "link", "file", "movie",
    "admin", "owner", "support",
];

static FILLER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"^hi+$", r"^hey+$", r"^ok+$", r"^thanks?$", r"^\?+$", r"^!+$"]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("Invalid regex"))
        .collect()
});

/// Whether a message is chatter rather than a title search: empty, a single
/// short token, a filler word, or a greeting/acknowledgement pattern.
pub fn is_filler(query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.chars().count() < 2 {
        return true;
    }
    if FILLER_WORDS.contains(&query.as_str()) {
        return true;
    }
    let mut words = query.split_whitespace();
    if let (Some(word), None) = (words.next(), words.next())
        && word.chars().count() < 3
    {
        return true;
    }
    FILLER_PATTERNS.iter().any(|pattern| pattern.is_match(&query))
}
