use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A series document: the root of the catalog tree.
///
/// `languages[lang].seasons[season]` holds season-level batch qualities and
/// per-episode single-file qualities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Series {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    /// Telegram file id, or a poster URL from a metadata lookup.
    #[serde(default)]
    pub poster_file_id: Option<String>,
    #[serde(default)]
    pub languages: BTreeMap<String, Language>,
    #[serde(default)]
    pub published: bool,
    /// Message id of the current announcement, if one is on record.
    #[serde(default)]
    pub announcement_message_id: Option<i64>,
    /// Digest of the publishable structure at the last successful announcement.
    #[serde(default)]
    pub content_snapshot: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Series {
    pub fn new(title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: new_node_id(),
            title: title.into().trim().to_string(),
            year: None,
            genre: None,
            rating: None,
            imdb_id: None,
            poster_file_id: None,
            languages: BTreeMap::new(),
            published: false,
            announcement_message_id: None,
            content_snapshot: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn with_imdb_id(mut self, imdb_id: impl Into<String>) -> Self {
        self.imdb_id = Some(imdb_id.into());
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_rating(mut self, rating: impl Into<String>) -> Self {
        self.rating = Some(rating.into());
        self
    }

    pub fn with_poster(mut self, poster: impl Into<String>) -> Self {
        self.poster_file_id = Some(poster.into());
        self
    }

    /// `Title (Year)` or just the title.
    pub fn display_title(&self) -> String {
        match self.year.as_deref().filter(|year| !year.trim().is_empty()) {
            Some(year) => format!("{} ({})", self.title, year.trim()),
            None => self.title.clone(),
        }
    }

    pub fn language(&self, lang_id: &str) -> Option<&Language> {
        self.languages.get(lang_id)
    }

    pub fn season(&self, lang_id: &str, season_id: &str) -> Option<&Season> {
        self.language(lang_id)?.seasons.get(season_id)
    }

    pub fn batch_quality(
        &self,
        lang_id: &str,
        season_id: &str,
        quality_id: &str,
    ) -> Option<&BatchQuality> {
        self.season(lang_id, season_id)?.qualities.get(quality_id)
    }

    pub fn episode(&self, lang_id: &str, season_id: &str, episode_id: &str) -> Option<&Episode> {
        self.season(lang_id, season_id)?.episodes.get(episode_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Language {
    pub name: String,
    #[serde(default)]
    pub seasons: BTreeMap<String, Season>,
}

impl Language {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seasons: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Season {
    pub name: String,
    #[serde(default)]
    pub qualities: BTreeMap<String, BatchQuality>,
    #[serde(default)]
    pub episodes: BTreeMap<String, Episode>,
}

impl Season {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualities: BTreeMap::new(),
            episodes: BTreeMap::new(),
        }
    }

    /// Season number parsed from the name (`Season 2`, `S02`, `2`).
    pub fn number(&self) -> Option<u32> {
        leading_number(&self.name)
    }
}

/// Season-level batch: a contiguous canonical range for one quality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchQuality {
    pub name: String,
    #[serde(default)]
    pub first_msg_id: Option<i64>,
    #[serde(default)]
    pub last_msg_id: Option<i64>,
    #[serde(default)]
    pub canonical_channel_id: Option<i64>,
    #[serde(default)]
    pub share_link: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl BatchQuality {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            first_msg_id: None,
            last_msg_id: None,
            canonical_channel_id: None,
            share_link: None,
            published: false,
        }
    }

    /// Published and carrying a link.
    pub fn is_live(&self) -> bool {
        self.published && self.share_link.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub name: String,
    #[serde(default)]
    pub qualities: BTreeMap<String, EpisodeQuality>,
}

impl Episode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualities: BTreeMap::new(),
        }
    }

    /// Episode number parsed from the name (`Episode 5`, `E05`, `5`).
    pub fn number(&self) -> Option<u32> {
        leading_number(&self.name)
    }
}

/// Single-file quality of one episode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeQuality {
    pub name: String,
    #[serde(default)]
    pub msg_id: Option<i64>,
    #[serde(default)]
    pub file_link: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl EpisodeQuality {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            msg_id: None,
            file_link: None,
            published: false,
        }
    }

    pub fn is_live(&self) -> bool {
        self.published && self.file_link.is_some()
    }
}

/// Editable series metadata, as typed by an admin:
///
/// ```text
/// Title: Dark
/// Year: 2017
/// Genre: Thriller
/// Rating: 8.7
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeriesDetails {
    pub title: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<String>,
}

impl SeriesDetails {
    /// Parse `Key: value` lines. `Released` is accepted for the year.
    /// Returns `None` when no recognized line is present.
    pub fn parse(text: &str) -> Option<Self> {
        let mut details = Self::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match key.trim().to_ascii_lowercase().as_str() {
                "title" => &mut details.title,
                "year" | "released" => &mut details.year,
                "genre" => &mut details.genre,
                "rating" => &mut details.rating,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        (details != Self::default()).then_some(details)
    }
}

/// Location of a node in the catalog tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogCoordinates {
    pub series_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_id: Option<String>,
}

impl CatalogCoordinates {
    pub fn series(series_id: impl Into<String>) -> Self {
        Self {
            series_id: series_id.into(),
            ..Self::default()
        }
    }

    pub fn with_lang(mut self, lang_id: impl Into<String>) -> Self {
        self.lang_id = Some(lang_id.into());
        self
    }

    pub fn with_season(mut self, season_id: impl Into<String>) -> Self {
        self.season_id = Some(season_id.into());
        self
    }

    pub fn with_episode(mut self, episode_id: impl Into<String>) -> Self {
        self.episode_id = Some(episode_id.into());
        self
    }

    pub fn with_quality(mut self, quality_id: impl Into<String>) -> Self {
        self.quality_id = Some(quality_id.into());
        self
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang_id.as_deref()
    }

    pub fn season(&self) -> Option<&str> {
        self.season_id.as_deref()
    }

    pub fn episode(&self) -> Option<&str> {
        self.episode_id.as_deref()
    }

    pub fn quality(&self) -> Option<&str> {
        self.quality_id.as_deref()
    }
}

/// Short random id for catalog nodes.
pub fn new_node_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn leading_number(name: &str) -> Option<u32> {
    let digits: String = name
        .chars()
        .skip_while(|ch| !ch.is_ascii_digit())
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
