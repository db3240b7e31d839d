//! Structural digest of a series' publishable content.
//!
//! Only the names of live batch and episode qualities take part, sorted, so
//! poster or metadata edits never produce a new announcement.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;

use crate::models::{Season, Series};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedLanguage {
    pub name: String,
    pub seasons: Vec<PublishedSeason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedSeason {
    pub name: String,
    pub number: Option<u32>,
    pub batch_qualities: Vec<String>,
    pub episodes: Vec<PublishedEpisode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedEpisode {
    pub name: String,
    pub number: Option<u32>,
    pub qualities: Vec<String>,
}

/// Project a series onto what is currently live, in a stable order.
/// Languages and seasons with nothing live are left out.
pub fn published_view(series: &Series) -> Vec<PublishedLanguage> {
    let mut languages: Vec<PublishedLanguage> = series
        .languages
        .values()
        .map(|language| {
            let mut seasons: Vec<PublishedSeason> = language
                .seasons
                .values()
                .map(published_season)
                .filter(|season| {
                    !season.batch_qualities.is_empty() || !season.episodes.is_empty()
                })
                .collect();
            seasons.sort_by(|a, b| by_number_then_name(a.number, &a.name, b.number, &b.name));
            PublishedLanguage {
                name: language.name.clone(),
                seasons,
            }
        })
        .filter(|language| !language.seasons.is_empty())
        .collect();
    languages.sort_by(|a, b| a.name.cmp(&b.name));
    languages
}

fn published_season(season: &Season) -> PublishedSeason {
    let mut batch_qualities: Vec<String> = season
        .qualities
        .values()
        .filter(|quality| quality.is_live())
        .map(|quality| quality.name.clone())
        .collect();
    batch_qualities.sort();

    let mut episodes: Vec<PublishedEpisode> = season
        .episodes
        .values()
        .filter_map(|episode| {
            let mut qualities: Vec<String> = episode
                .qualities
                .values()
                .filter(|quality| quality.is_live())
                .map(|quality| quality.name.clone())
                .collect();
            if qualities.is_empty() {
                return None;
            }
            qualities.sort();
            Some(PublishedEpisode {
                name: episode.name.clone(),
                number: episode.number(),
                qualities,
            })
        })
        .collect();
    episodes.sort_by(|a, b| by_number_then_name(a.number, &a.name, b.number, &b.name));

    PublishedSeason {
        name: season.name.clone(),
        number: season.number(),
        batch_qualities,
        episodes,
    }
}

/// Numbered entries first, ascending; then by name.
fn by_number_then_name(a: Option<u32>, a_name: &str, b: Option<u32>, b_name: &str) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b).then_with(|| a_name.cmp(b_name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a_name.cmp(b_name),
    }
}

/// Hex SHA-256 over the published view.
pub fn content_digest(series: &Series) -> String {
    let view = published_view(series);
    // Serializing plain strings, numbers and vectors cannot fail.
    let canonical = serde_json::to_string(&view).unwrap_or_default();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Whether the stored digest differs from the current content.
pub fn should_announce(stored: Option<&str>, current: &str) -> bool {
    stored != Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchQuality, Episode, EpisodeQuality, Language};

    fn live_batch(name: &str) -> BatchQuality {
        let mut quality = BatchQuality::new(name);
        quality.share_link = Some(format!("https://t.me/bot?start=get_1_1_{}", name.len()));
        quality.published = true;
        quality
    }

    fn series_with(qualities: &[(&str, BatchQuality)]) -> Series {
        let mut season = Season::new("Season 1");
        for (id, quality) in qualities {
            season.qualities.insert(id.to_string(), quality.clone());
        }
        let mut language = Language::new("English");
        language.seasons.insert("s1".to_string(), season);
        let mut series = Series::new("Dark");
        series.languages.insert("en".to_string(), language);
        series
    }

    fn set_quality_published(series: &mut Series, quality_id: &str, published: bool) {
        series
            .languages
            .get_mut("en")
            .and_then(|l| l.seasons.get_mut("s1"))
            .and_then(|s| s.qualities.get_mut(quality_id))
            .unwrap()
            .published = published;
    }

    #[test]
    fn test_digest_is_idempotent() {
        let series = series_with(&[("q1", live_batch("720p"))]);
        let digest = content_digest(&series);
        assert!(!should_announce(Some(&digest), &content_digest(&series)));
        assert!(should_announce(None, &digest));
    }

    #[test]
    fn test_new_published_quality_changes_digest() {
        let before = series_with(&[("q1", live_batch("720p"))]);
        let after = series_with(&[("q1", live_batch("720p")), ("q2", live_batch("1080p"))]);
        assert!(should_announce(
            Some(&content_digest(&before)),
            &content_digest(&after)
        ));
    }

    #[test]
    fn test_unpublish_then_republish_is_unchanged() {
        let original = series_with(&[("q1", live_batch("720p")), ("q2", live_batch("1080p"))]);
        let stored = content_digest(&original);

        let mut toggled = original.clone();
        set_quality_published(&mut toggled, "q2", false);
        assert!(should_announce(Some(&stored), &content_digest(&toggled)));
        set_quality_published(&mut toggled, "q2", true);
        assert!(!should_announce(Some(&stored), &content_digest(&toggled)));
    }

    #[test]
    fn test_metadata_and_unpublished_nodes_are_ignored() {
        let series = series_with(&[("q1", live_batch("720p"))]);
        let digest = content_digest(&series);

        let mut edited = series.clone();
        edited.poster_file_id = Some("poster".to_string());
        edited.year = Some("2017".to_string());
        edited.genre = Some("Thriller".to_string());
        edited
            .languages
            .insert("hi".to_string(), Language::new("Hindi"));
        edited
            .languages
            .get_mut("en")
            .unwrap()
            .seasons
            .get_mut("s1")
            .unwrap()
            .qualities
            .insert("q9".to_string(), BatchQuality::new("480p"));

        assert_eq!(content_digest(&edited), digest);
    }

    #[test]
    fn test_node_ids_do_not_affect_digest() {
        let a = series_with(&[("q1", live_batch("720p")), ("q2", live_batch("1080p"))]);
        let b = series_with(&[("zz", live_batch("1080p")), ("aa", live_batch("720p"))]);
        assert_eq!(content_digest(&a), content_digest(&b));
    }

    #[test]
    fn test_view_orders_seasons_and_episodes_by_number() {
        let mut language = Language::new("English");
        for (id, name) in [("b", "Season 10"), ("a", "Season 2")] {
            let mut season = Season::new(name);
            let mut episode = Episode::new("Episode 1");
            let mut quality = EpisodeQuality::new("720p");
            quality.file_link = Some("link".to_string());
            quality.published = true;
            episode.qualities.insert("q".to_string(), quality);
            season.episodes.insert("e".to_string(), episode);
            language.seasons.insert(id.to_string(), season);
        }
        let mut series = Series::new("Dark");
        series.languages.insert("en".to_string(), language);

        let view = published_view(&series);
        let names: Vec<&str> = view[0].seasons.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Season 2", "Season 10"]);
    }
}
