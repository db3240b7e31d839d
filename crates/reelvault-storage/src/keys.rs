//! Composite key helpers for tables whose keys are `:`-joined segments.

/// Separator between key segments.
pub const KEY_SEPARATOR: char = ':';

/// Join segments into a composite key, e.g. `series:lang:season:quality`.
///
/// Segments are trimmed; a separator inside a segment is replaced with `_`
/// so a key always splits back into the same number of parts.
pub fn compose_key<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|segment| segment.as_ref().trim().replace(KEY_SEPARATOR, "_"))
        .collect::<Vec<_>>()
        .join(&KEY_SEPARATOR.to_string())
}

/// Half-open `[start, end)` bounds covering every key beginning with `prefix`.
///
/// The end bound bumps the last byte, so `"s1:"` scans up to `"s1;"`.
pub fn prefix_bounds(prefix: &str) -> (String, String) {
    let mut end = prefix.as_bytes().to_vec();
    match end.last_mut() {
        Some(last) if *last < 0x7F => *last += 1,
        Some(_) => end.push(0x7F),
        None => return (String::new(), String::new()),
    }
    let end = String::from_utf8(end).unwrap_or_else(|_| format!("{prefix}\x7F"));
    (prefix.to_string(), end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_key_joins_and_sanitizes() {
        assert_eq!(compose_key(&["s1", "en", "s01", "720p"]), "s1:en:s01:720p");
        assert_eq!(compose_key(&[" a:b ", "c"]), "a_b:c");
    }

    #[test]
    fn prefix_bounds_bumps_last_byte() {
        assert_eq!(
            prefix_bounds("series-1:"),
            ("series-1:".to_string(), "series-1;".to_string())
        );
        assert_eq!(prefix_bounds(""), (String::new(), String::new()));
    }
}
