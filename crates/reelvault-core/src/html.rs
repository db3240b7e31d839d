//! Escaping for Telegram's HTML parse mode.

/// Escape `<`, `>` and `&` so arbitrary text is safe inside HTML captions.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("Tom & Jerry <HD>"), "Tom &amp; Jerry &lt;HD&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
