//! Caption templates for replicated files.
//!
//! Templates use `{placeholder}` tokens. Values come from the catalog context
//! first and from patterns in the file's original caption second.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::html::escape_html;

pub const DEFAULT_CAPTION_TEMPLATE: &str = "<code>{filename}</code>";

static SEASON_EPISODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)S(\d{1,2})\s?E(\d{1,3})",
        r"(?i)Season[\s_.]*(\d{1,2})[\s_.]*Episode[\s_.]*(\d{1,3})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid regex"))
    .collect()
});

static QUALITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(2160p|4K|1080p|720p|480p|360p)\b",
        r"(?i)\b(UHD|FHD|HD|SD)\b",
        r"(?i)\b(\d{3,4}p)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid regex"))
    .collect()
});

static CODEC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(H\.?26[45]|HEVC|x26[45]|AVC)\b").expect("Invalid regex"));

static LANGUAGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(English|Hindi|Tamil|Telugu|Malayalam|Kannada|Bengali|Punjabi|Marathi)\b",
        r"(?i)\b(Dual\s*Audio|Multi\s*Audio)\b",
        r"(?i)\b(ENG|HIN|TAM|TEL|MAL)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid regex"))
    .collect()
});

/// Release noise stripped when guessing a series name from a caption.
static TECHNICAL_TERMS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)S\d{1,2}\s?E\d{1,3}",
        r"(?i)Season[\s_.]*\d{1,2}[\s_.]*Episode[\s_.]*\d{1,3}",
        r"(?i)\b(2160p|4K|1080p|720p|480p|360p|UHD|FHD|HD|SD)\b",
        r"(?i)\b(H\.?26[45]|HEVC|x26[45]|AVC|WEB-DL|WEBRip|BluRay|BRRip|HDRip|DVDRip)\b",
        r"(?i)\b(AAC|AC3|DDP|DD|Atmos|TrueHD|DTS|MP3)\b",
        r"(?i)\b(10bit|8bit|5\.1|2\.0)\b",
        r"(?i)\b(English|Hindi|Tamil|Telugu|Malayalam|Kannada|Bengali|Punjabi|Marathi)\b",
        r"(?i)\b(Dual\s*Audio|Multi\s*Audio)\b",
        r"(?i)\b(ENG|HIN|TAM|TEL|MAL)\b",
        r"(?i)\b(PROPER|REPACK|INTERNAL|LIMITED)\b",
        r"(?i)\b(NF|AMZN|DSNP|HULU|HMAX|SHO|ATVP)\b",
        r"\.(mkv|mp4|avi|mov|webm|m4v)$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid regex"))
    .collect()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex"));
static EDGE_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\w\s]+|[^\w\s]+$").expect("Invalid regex"));

/// Catalog-side values for a render. Present values win over extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionContext {
    pub series_name: Option<String>,
    pub language: Option<String>,
    pub quality: Option<String>,
    pub season: Option<String>,
    pub episode: Option<String>,
}

impl CaptionContext {
    pub fn with_series_name(mut self, name: impl Into<String>) -> Self {
        self.series_name = Some(name.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    pub fn with_episode(mut self, episode: impl Into<String>) -> Self {
        self.episode = Some(episode.into());
        self
    }
}

/// What could be recognized in an original caption.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionInfo {
    pub series_name: Option<String>,
    pub season: Option<String>,
    pub episode: Option<String>,
    pub quality: Option<String>,
    pub language: Option<String>,
}

/// Recognize season/episode, quality, language and a series name in a caption.
pub fn extract_caption_info(caption: &str) -> CaptionInfo {
    let mut info = CaptionInfo::default();
    if caption.trim().is_empty() {
        return info;
    }
    // `_` is a word character, so `Name_720p` would defeat `\b`.
    let caption = caption.replace('_', " ");
    let caption = caption.as_str();

    if let Some(captures) = SEASON_EPISODE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(caption))
    {
        info.season = captures.get(1).map(|m| zero_pad(m.as_str()));
        info.episode = captures.get(2).map(|m| zero_pad(m.as_str()));
    }

    let quality = first_capture(&QUALITY_PATTERNS, caption);
    let codec = CODEC_PATTERN
        .captures(caption)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string());
    info.quality = match (quality, codec) {
        (Some(quality), Some(codec)) => Some(format!("{}.{}", quality, codec)),
        (quality, codec) => quality.or(codec),
    };

    info.language = first_capture(&LANGUAGE_PATTERNS, caption);

    let mut name = caption.to_string();
    for term in TECHNICAL_TERMS.iter() {
        name = term.replace_all(&name, "").into_owned();
    }
    let name = name.replace(['.', '_', '-'], " ");
    let name = WHITESPACE.replace_all(&name, " ");
    let name = EDGE_PUNCTUATION.replace_all(name.trim(), "");
    let name = name.trim();
    if !name.is_empty() {
        info.series_name = Some(name.to_string());
    }

    info
}

/// Render `template`. Known placeholders without a value render empty;
/// unknown `{tokens}` and braces that never close are kept literally.
pub fn render_caption(
    template: &str,
    file_name: &str,
    original_caption: &str,
    context: &CaptionContext,
) -> String {
    let extracted = extract_caption_info(original_caption);
    let resolve = |key: &str| -> Option<String> {
        let value = match key {
            "filename" => Some(file_name.to_string()),
            "filecaption" => Some(original_caption.to_string()),
            "seriesname" => context.series_name.clone().or(extracted.series_name.clone()),
            "language" => context.language.clone().or(extracted.language.clone()),
            "quality" => context.quality.clone().or(extracted.quality.clone()),
            "season" => context
                .season
                .as_deref()
                .map(number_or_raw)
                .or(extracted.season.clone()),
            "episode" => context
                .episode
                .as_deref()
                .map(number_or_raw)
                .or(extracted.episode.clone()),
            _ => return None,
        };
        Some(value.map(|value| escape_html(&value)).unwrap_or_default())
    };

    let mut output = String::with_capacity(template.len() + file_name.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            output.push('{');
            rest = after;
            break;
        };
        let inner = &after[..close];
        if inner.contains('{') {
            // `{` that does not open a placeholder
            output.push('{');
            rest = after;
            continue;
        }
        match resolve(&placeholder_key(inner)) {
            Some(value) => output.push_str(&value),
            None => {
                output.push('{');
                output.push_str(inner);
                output.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    output.push_str(rest);
    output
}

/// `{File_Name}`, `{FILENAME}` and `{filename}` all name the same value.
fn placeholder_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|ch| *ch != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|pattern| pattern.captures(text))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

fn zero_pad(digits: &str) -> String {
    format!("{:0>2}", digits)
}

/// `Season 2` renders as `02`; values without digits are kept.
fn number_or_raw(value: &str) -> String {
    let digits: String = value
        .chars()
        .skip_while(|ch| !ch.is_ascii_digit())
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        value.to_string()
    } else {
        zero_pad(&digits)
    }
}
