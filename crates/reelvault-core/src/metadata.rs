//! Series metadata lookup for `/newseries`.
//!
//! Queries TMDB (`search/tv`) and OMDb (`type=series`) when their API keys
//! are configured, merges the hits, drops duplicates by title and year and
//! ranks them by how complete their metadata is. Results are cached by id so
//! a later pick can create the series without another round trip.

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::MetadataError;

pub const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";
pub const OMDB_API_BASE: &str = "https://www.omdbapi.com";
const TMDB_POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
const API_TIMEOUT_SECS: u64 = 10;
const TMDB_RESULT_LIMIT: usize = 5;
const OMDB_RESULT_LIMIT: usize = 3;
const MAX_RESULTS: usize = 10;
/// The cache is dropped wholesale once it holds more entries than this.
const MAX_CACHED: usize = 200;

pub type MetadataResult<T> = std::result::Result<T, MetadataError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default)]
    pub tmdb_api_key: Option<String>,
    #[serde(default)]
    pub omdb_api_key: Option<String>,
    #[serde(default = "default_tmdb_base")]
    pub tmdb_api_base: String,
    #[serde(default = "default_omdb_base")]
    pub omdb_api_base: String,
}

fn default_tmdb_base() -> String {
    TMDB_API_BASE.to_string()
}

fn default_omdb_base() -> String {
    OMDB_API_BASE.to_string()
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            omdb_api_key: None,
            tmdb_api_base: default_tmdb_base(),
            omdb_api_base: default_omdb_base(),
        }
    }
}

impl MetadataConfig {
    pub fn is_enabled(&self) -> bool {
        self.tmdb_key().is_some() || self.omdb_key().is_some()
    }

    fn tmdb_key(&self) -> Option<&str> {
        self.tmdb_api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    fn omdb_key(&self) -> Option<&str> {
        self.omdb_api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    Tmdb,
    Omdb,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesMetadata {
    /// `tmdb-<id>` or the IMDb id.
    pub id: String,
    pub source: MetadataSource,
    pub title: String,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<String>,
    pub imdb_id: Option<String>,
    pub poster_url: Option<String>,
    pub overview: Option<String>,
}

impl SeriesMetadata {
    /// 20 points each for poster, title, year, genre and rating.
    pub fn completeness(&self) -> u8 {
        [
            present(self.poster_url.as_deref()),
            present(Some(self.title.as_str())),
            present(self.year.as_deref()),
            present(self.genre.as_deref()),
            present(self.rating.as_deref()),
        ]
        .into_iter()
        .filter(|&filled| filled)
        .count() as u8
            * 20
    }

    /// `Title (Year)`, with the completeness appended when below 100%.
    pub fn label(&self) -> String {
        let mut label = match self.year.as_deref() {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        };
        let completeness = self.completeness();
        if completeness < 100 {
            label.push_str(&format!(" - {}%", completeness));
        }
        label
    }

    fn dedup_key(&self) -> String {
        format!(
            "{}_{}",
            self.title.trim().to_lowercase(),
            self.year.as_deref().unwrap_or_default()
        )
    }
}

fn present(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim();
        !v.is_empty() && v != "N/A" && v != "0" && v != "0.0"
    })
}

/// Empty strings and OMDb's `N/A` become `None`.
fn field(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "N/A")
}

pub struct MetadataClient {
    config: MetadataConfig,
    client: Client,
    cache: RwLock<HashMap<String, SeriesMetadata>>,
}

impl MetadataClient {
    pub fn new(config: MetadataConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Search every configured provider. A failing provider is logged and
    /// skipped; the error surfaces only when no provider answered.
    pub async fn search(&self, query: &str) -> MetadataResult<Vec<SeriesMetadata>> {
        let query = query.trim();
        let mut hits = Vec::new();
        let mut answered = false;
        let mut last_error = None;

        if let Some(key) = self.config.tmdb_key() {
            match self.search_tmdb(key, query).await {
                Ok(found) => {
                    answered = true;
                    hits.extend(found);
                }
                Err(e) => {
                    warn!("TMDB search for '{}' failed: {}", query, e);
                    last_error = Some(e);
                }
            }
        }
        if let Some(key) = self.config.omdb_key() {
            match self.search_omdb(key, query).await {
                Ok(found) => {
                    answered = true;
                    hits.extend(found);
                }
                Err(e) => {
                    warn!("OMDb search for '{}' failed: {}", query, e);
                    last_error = Some(e);
                }
            }
        }
        if !answered && let Some(e) = last_error {
            return Err(e);
        }

        let results = rank(hits);
        info!("Metadata search '{}': {} results", query, results.len());
        self.remember(&results).await;
        Ok(results)
    }

    /// A result from an earlier search.
    pub async fn cached(&self, id: &str) -> Option<SeriesMetadata> {
        self.cache.read().await.get(id).cloned()
    }

    async fn remember(&self, results: &[SeriesMetadata]) {
        let mut cache = self.cache.write().await;
        if cache.len() + results.len() > MAX_CACHED {
            debug!("Dropping {} cached metadata results", cache.len());
            cache.clear();
        }
        for result in results {
            cache.insert(result.id.clone(), result.clone());
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        provider: &'static str,
        url: Url,
    ) -> MetadataResult<T> {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status {
                provider,
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn search_tmdb(&self, key: &str, query: &str) -> MetadataResult<Vec<SeriesMetadata>> {
        let url = endpoint(
            &format!("{}/search/tv", self.config.tmdb_api_base),
            &[("api_key", key), ("query", query)],
        )?;
        let page: TmdbPage = self.get_json("TMDB", url).await?;
        Ok(page
            .results
            .into_iter()
            .take(TMDB_RESULT_LIMIT)
            .map(TmdbShow::into_metadata)
            .collect())
    }

    async fn search_omdb(&self, key: &str, query: &str) -> MetadataResult<Vec<SeriesMetadata>> {
        let url = endpoint(
            &self.config.omdb_api_base,
            &[("apikey", key), ("s", query), ("type", "series")],
        )?;
        let page: OmdbSearch = self.get_json("OMDb", url).await?;
        if page.response != "True" {
            let message = page.error.unwrap_or_default();
            // "Series not found!" is an empty result, not a failure.
            if message.to_lowercase().contains("not found") {
                return Ok(Vec::new());
            }
            return Err(MetadataError::Provider {
                provider: "OMDb",
                message,
            });
        }

        let mut found = Vec::new();
        for hit in page.search.into_iter().take(OMDB_RESULT_LIMIT) {
            let url = endpoint(
                &self.config.omdb_api_base,
                &[("apikey", key), ("i", hit.imdb_id.as_str())],
            )?;
            match self.get_json::<OmdbDetail>("OMDb", url).await {
                Ok(detail) if detail.response == "True" && detail.kind == "series" => {
                    found.push(detail.into_metadata());
                }
                Ok(_) => debug!("Skipping OMDb result {}", hit.imdb_id),
                Err(e) => warn!("OMDb details for {} failed: {}", hit.imdb_id, e),
            }
        }
        Ok(found)
    }
}

fn endpoint(base: &str, params: &[(&str, &str)]) -> MetadataResult<Url> {
    Url::parse_with_params(base, params).map_err(|e| MetadataError::Url(e.to_string()))
}

/// Drop duplicates (first hit wins), order by completeness and cap the list.
fn rank(hits: Vec<SeriesMetadata>) -> Vec<SeriesMetadata> {
    let mut seen = HashSet::new();
    let mut results: Vec<SeriesMetadata> = hits
        .into_iter()
        .filter(|hit| seen.insert(hit.dedup_key()))
        .collect();
    results.sort_by_key(|hit| std::cmp::Reverse(hit.completeness()));
    results.truncate(MAX_RESULTS);
    results
}

fn tmdb_genre(id: i64) -> Option<&'static str> {
    Some(match id {
        10759 => "Action & Adventure",
        16 => "Animation",
        35 => "Comedy",
        80 => "Crime",
        99 => "Documentary",
        18 => "Drama",
        10751 => "Family",
        10762 => "Kids",
        9648 => "Mystery",
        10763 => "News",
        10764 => "Reality",
        10765 => "Sci-Fi & Fantasy",
        10766 => "Soap",
        10767 => "Talk",
        10768 => "War & Politics",
        37 => "Western",
        _ => return None,
    })
}

#[derive(Debug, Deserialize)]
struct TmdbPage {
    #[serde(default)]
    results: Vec<TmdbShow>,
}

#[derive(Debug, Deserialize)]
struct TmdbShow {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    first_air_date: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    vote_average: Option<f64>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    genre_ids: Vec<i64>,
}

impl TmdbShow {
    fn into_metadata(self) -> SeriesMetadata {
        let genres: Vec<&str> = self.genre_ids.iter().filter_map(|&id| tmdb_genre(id)).collect();
        SeriesMetadata {
            id: format!("tmdb-{}", self.id),
            source: MetadataSource::Tmdb,
            title: field(self.name).unwrap_or_else(|| "Unknown".to_string()),
            year: field(self.first_air_date).map(|date| date.chars().take(4).collect()),
            genre: (!genres.is_empty()).then(|| genres.join(", ")),
            rating: self
                .vote_average
                .filter(|rating| *rating > 0.0)
                .map(|rating| format!("{:.1}", rating)),
            imdb_id: None,
            poster_url: field(self.poster_path).map(|path| format!("{}{}", TMDB_POSTER_BASE, path)),
            overview: field(self.overview),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmdbSearch {
    #[serde(rename = "Response", default)]
    response: String,
    #[serde(rename = "Error", default)]
    error: Option<String>,
    #[serde(rename = "Search", default)]
    search: Vec<OmdbHit>,
}

#[derive(Debug, Deserialize)]
struct OmdbHit {
    #[serde(rename = "imdbID")]
    imdb_id: String,
}

#[derive(Debug, Deserialize)]
struct OmdbDetail {
    #[serde(rename = "Response", default)]
    response: String,
    #[serde(rename = "Type", default)]
    kind: String,
    #[serde(rename = "imdbID", default)]
    imdb_id: String,
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "Year", default)]
    year: Option<String>,
    #[serde(rename = "Genre", default)]
    genre: Option<String>,
    #[serde(rename = "imdbRating", default)]
    rating: Option<String>,
    #[serde(rename = "Poster", default)]
    poster: Option<String>,
    #[serde(rename = "Plot", default)]
    plot: Option<String>,
}

impl OmdbDetail {
    fn into_metadata(self) -> SeriesMetadata {
        SeriesMetadata {
            id: self.imdb_id.clone(),
            source: MetadataSource::Omdb,
            title: field(self.title).unwrap_or_else(|| "Unknown".to_string()),
            // Running series come as "2019–" or "2019–2023".
            year: field(self.year)
                .and_then(|year| field(year.split(['–', '-']).next().map(str::to_string))),
            genre: field(self.genre),
            rating: field(self.rating),
            imdb_id: field(Some(self.imdb_id)),
            poster_url: field(self.poster),
            overview: field(self.plot),
        }
    }
}
