use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("Invalid regex"));

/// Known misspellings, applied token by token.
static CORRECTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("stanger", "stranger"),
        ("breking", "breaking"),
        ("peecmaker", "peacemaker"),
        ("walkng", "walking"),
        ("ofice", "office"),
        ("freinds", "friends"),
        ("simpsns", "simpsons"),
        ("comunity", "community"),
    ])
});

/// Drop punctuation, collapse whitespace, lowercase.
pub fn normalize(text: &str) -> String {
    let stripped = NON_WORD.replace_all(text, "");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Replace known misspellings in an already normalized query.
pub fn apply_corrections(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| CORRECTIONS.get(word).copied().unwrap_or(word))
        .collect::<Vec<_>>()
        .join(" ")
}
