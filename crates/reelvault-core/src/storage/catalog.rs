//! Typed catalog operations over a [`CatalogStore`].
//!
//! Every mutation is a path-scoped `set`/`unset` on the series document, so
//! concurrent edits to different nodes of the same series do not clobber
//! each other. Edits to the same field are last-write-wins. Writes below a
//! node are guarded on that node, so a write racing a delete fails instead
//! of resurrecting a half-formed node.

use anyhow::{Result, anyhow, bail};
use serde_json::{Value, json};
use std::sync::Arc;

use super::document::{CatalogStore, DocumentFilter, WriteOutcome};
use super::path::FieldPath;
use crate::models::{
    BatchQuality, CatalogCoordinates, Episode, EpisodeQuality, Language, Season, Series,
    SeriesDetails, new_node_id,
};

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn CatalogStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn create_series(&self, series: Series) -> Result<Series> {
        self.store
            .insert_document(&series.id, serde_json::to_value(&series)?)
            .await?;
        tracing::info!("Created series {} ({})", series.title, series.id);
        Ok(series)
    }

    pub async fn get_series(&self, id: &str) -> Result<Option<Series>> {
        match self.store.get_document(id).await? {
            Some(document) => Ok(Some(serde_json::from_value(document)?)),
            None => Ok(None),
        }
    }

    pub async fn require_series(&self, id: &str) -> Result<Series> {
        self.get_series(id)
            .await?
            .ok_or_else(|| anyhow!("Series not found: {}", id))
    }

    /// All series, sorted by title.
    pub async fn list_series(&self) -> Result<Vec<Series>> {
        self.list(&DocumentFilter::all()).await
    }

    pub async fn list_published(&self) -> Result<Vec<Series>> {
        self.list(&DocumentFilter::all().field_eq(FieldPath::root("published"), json!(true)))
            .await
    }

    /// Published series, newest first.
    pub async fn recent_series(&self, limit: usize) -> Result<Vec<Series>> {
        let mut series = self.list_published().await?;
        series.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        series.truncate(limit);
        Ok(series)
    }

    /// Whether a series with this IMDb id or (case-insensitive) title exists.
    pub async fn series_exists(&self, imdb_id: Option<&str>, title: &str) -> Result<bool> {
        let title = title.trim().to_lowercase();
        let imdb_id = imdb_id.map(str::trim).filter(|id| !id.is_empty());
        Ok(self.list_series().await?.iter().any(|series| {
            series.title.trim().to_lowercase() == title
                || (imdb_id.is_some() && series.imdb_id.as_deref() == imdb_id)
        }))
    }

    pub async fn delete_series(&self, id: &str) -> Result<bool> {
        let deleted = self.store.delete_document(id).await?;
        if deleted {
            tracing::info!("Deleted series {}", id);
        }
        Ok(deleted)
    }

    pub async fn add_language(&self, series_id: &str, name: &str) -> Result<String> {
        self.require_series(series_id).await?;
        let lang_id = new_node_id();
        self.set(
            series_id,
            vec![(
                FieldPath::language(&lang_id),
                serde_json::to_value(Language::new(name.trim()))?,
            )],
        )
        .await?;
        Ok(lang_id)
    }

    pub async fn delete_language(&self, at: &CatalogCoordinates) -> Result<()> {
        let lang = part(at.lang(), "language")?;
        self.unset(&at.series_id, FieldPath::language(lang)).await
    }

    pub async fn add_season(&self, at: &CatalogCoordinates, name: &str) -> Result<String> {
        let lang = part(at.lang(), "language")?;
        let season_id = new_node_id();
        self.set_within(
            &at.series_id,
            FieldPath::language(lang),
            "Language",
            vec![(
                FieldPath::season(lang, &season_id),
                serde_json::to_value(Season::new(name.trim()))?,
            )],
        )
        .await?;
        Ok(season_id)
    }

    pub async fn delete_season(&self, at: &CatalogCoordinates) -> Result<()> {
        let (lang, season) = season_parts(at)?;
        self.unset(&at.series_id, FieldPath::season(lang, season))
            .await
    }

    pub async fn add_batch_quality(&self, at: &CatalogCoordinates, name: &str) -> Result<String> {
        let (lang, season) = season_parts(at)?;
        let quality_id = new_node_id();
        self.set_within(
            &at.series_id,
            FieldPath::season(lang, season),
            "Season",
            vec![(
                FieldPath::batch_quality(lang, season, &quality_id),
                serde_json::to_value(BatchQuality::new(name.trim()))?,
            )],
        )
        .await?;
        Ok(quality_id)
    }

    pub async fn delete_batch_quality(&self, at: &CatalogCoordinates) -> Result<()> {
        let (lang, season) = season_parts(at)?;
        let quality = part(at.quality(), "quality")?;
        self.unset(&at.series_id, FieldPath::batch_quality(lang, season, quality))
            .await
    }

    /// Store a replicated range and its link, publishing the quality.
    pub async fn set_batch_range(
        &self,
        at: &CatalogCoordinates,
        canonical_channel_id: i64,
        first_msg_id: i64,
        last_msg_id: i64,
        share_link: &str,
    ) -> Result<()> {
        let (lang, season) = season_parts(at)?;
        let quality = part(at.quality(), "quality")?;
        let node = FieldPath::batch_quality(lang, season, quality);
        self.set_within(
            &at.series_id,
            node.clone(),
            "Quality",
            vec![
                (node.clone().child("first_msg_id"), json!(first_msg_id)),
                (node.clone().child("last_msg_id"), json!(last_msg_id)),
                (
                    node.clone().child("canonical_channel_id"),
                    json!(canonical_channel_id),
                ),
                (node.clone().child("share_link"), json!(share_link)),
                (node.child("published"), json!(true)),
            ],
        )
        .await
    }

    /// Toggle a batch quality. Publishing requires a stored link.
    pub async fn set_batch_published(&self, at: &CatalogCoordinates, published: bool) -> Result<()> {
        let series = self.require_series(&at.series_id).await?;
        let (lang, season) = season_parts(at)?;
        let quality = part(at.quality(), "quality")?;
        let node = series
            .batch_quality(lang, season, quality)
            .ok_or_else(|| anyhow!("Quality not found: {}", quality))?;
        if published && node.share_link.is_none() {
            bail!("Quality {} has no batch link yet", node.name);
        }
        let node = FieldPath::batch_quality(lang, season, quality);
        self.set_within(
            &at.series_id,
            node.clone(),
            "Quality",
            vec![(node.child("published"), json!(published))],
        )
        .await
    }

    pub async fn add_episode(&self, at: &CatalogCoordinates, name: &str) -> Result<String> {
        let (lang, season) = season_parts(at)?;
        let episode_id = new_node_id();
        self.set_within(
            &at.series_id,
            FieldPath::season(lang, season),
            "Season",
            vec![(
                FieldPath::episode(lang, season, &episode_id),
                serde_json::to_value(Episode::new(name.trim()))?,
            )],
        )
        .await?;
        Ok(episode_id)
    }

    pub async fn delete_episode(&self, at: &CatalogCoordinates) -> Result<()> {
        let (lang, season) = season_parts(at)?;
        let episode = part(at.episode(), "episode")?;
        self.unset(&at.series_id, FieldPath::episode(lang, season, episode))
            .await
    }

    /// Remove every episode of a season.
    pub async fn clear_episodes(&self, at: &CatalogCoordinates) -> Result<()> {
        let (lang, season) = season_parts(at)?;
        self.set_within(
            &at.series_id,
            FieldPath::season(lang, season),
            "Season",
            vec![(FieldPath::episodes(lang, season), json!({}))],
        )
        .await
    }

    pub async fn add_episode_quality(&self, at: &CatalogCoordinates, name: &str) -> Result<String> {
        let (lang, season) = season_parts(at)?;
        let episode = part(at.episode(), "episode")?;
        let quality_id = new_node_id();
        self.set_within(
            &at.series_id,
            FieldPath::episode(lang, season, episode),
            "Episode",
            vec![(
                FieldPath::episode_quality(lang, season, episode, &quality_id),
                serde_json::to_value(EpisodeQuality::new(name.trim()))?,
            )],
        )
        .await?;
        Ok(quality_id)
    }

    pub async fn delete_episode_quality(&self, at: &CatalogCoordinates) -> Result<()> {
        let (lang, season) = season_parts(at)?;
        let episode = part(at.episode(), "episode")?;
        let quality = part(at.quality(), "quality")?;
        self.unset(
            &at.series_id,
            FieldPath::episode_quality(lang, season, episode, quality),
        )
        .await
    }

    /// Store a single canonical file for an episode quality and publish it.
    pub async fn set_episode_file(
        &self,
        at: &CatalogCoordinates,
        msg_id: i64,
        file_link: &str,
    ) -> Result<()> {
        let (lang, season) = season_parts(at)?;
        let episode = part(at.episode(), "episode")?;
        let quality = part(at.quality(), "quality")?;
        let node = FieldPath::episode_quality(lang, season, episode, quality);
        self.set_within(
            &at.series_id,
            node.clone(),
            "Quality",
            vec![
                (node.clone().child("msg_id"), json!(msg_id)),
                (node.clone().child("file_link"), json!(file_link)),
                (node.child("published"), json!(true)),
            ],
        )
        .await
    }

    pub async fn update_details(&self, series_id: &str, details: &SeriesDetails) -> Result<()> {
        let mut fields = Vec::new();
        for (field, value) in [
            ("title", &details.title),
            ("year", &details.year),
            ("genre", &details.genre),
            ("rating", &details.rating),
        ] {
            if let Some(value) = value {
                fields.push((FieldPath::root(field), json!(value)));
            }
        }
        if fields.is_empty() {
            bail!("No details to update");
        }
        self.set(series_id, fields).await
    }

    pub async fn update_poster(&self, series_id: &str, file_id: &str) -> Result<()> {
        self.set(
            series_id,
            vec![(FieldPath::root("poster_file_id"), json!(file_id))],
        )
        .await
    }

    pub async fn set_published(&self, series_id: &str, published: bool) -> Result<()> {
        self.set(
            series_id,
            vec![(FieldPath::root("published"), json!(published))],
        )
        .await
    }

    /// Record a successful announcement send/edit and the digest it reflects.
    pub async fn record_announcement(
        &self,
        series_id: &str,
        message_id: i64,
        digest: &str,
    ) -> Result<()> {
        self.set(
            series_id,
            vec![
                (FieldPath::root("announcement_message_id"), json!(message_id)),
                (FieldPath::root("content_snapshot"), json!(digest)),
            ],
        )
        .await
    }

    /// Forget the announcement message (deleted out-of-band or withdrawn).
    pub async fn clear_announcement_message(&self, series_id: &str) -> Result<()> {
        self.set(
            series_id,
            vec![(FieldPath::root("announcement_message_id"), Value::Null)],
        )
        .await
    }

    /// Forget both the message and the digest so the next publish announces afresh.
    pub async fn clear_announcement(&self, series_id: &str) -> Result<()> {
        self.set(
            series_id,
            vec![
                (FieldPath::root("announcement_message_id"), Value::Null),
                (FieldPath::root("content_snapshot"), Value::Null),
            ],
        )
        .await
    }

    async fn list(&self, filter: &DocumentFilter) -> Result<Vec<Series>> {
        let mut series = Vec::new();
        for document in self.store.list_documents(filter).await? {
            match serde_json::from_value::<Series>(document) {
                Ok(item) => series.push(item),
                Err(e) => tracing::warn!("Skipping malformed series document: {}", e),
            }
        }
        series.sort_by_key(|item| item.title.to_lowercase());
        Ok(series)
    }

    async fn set(&self, series_id: &str, mut fields: Vec<(FieldPath, Value)>) -> Result<()> {
        fields.push((
            FieldPath::root("updated_at"),
            json!(chrono::Utc::now().timestamp_millis()),
        ));
        if !self.store.set_fields(series_id, fields).await? {
            bail!("Series not found: {}", series_id);
        }
        Ok(())
    }

    /// Write fields below `node`, failing if the node no longer exists.
    async fn set_within(
        &self,
        series_id: &str,
        node: FieldPath,
        what: &str,
        mut fields: Vec<(FieldPath, Value)>,
    ) -> Result<()> {
        fields.push((
            FieldPath::root("updated_at"),
            json!(chrono::Utc::now().timestamp_millis()),
        ));
        match self.store.set_fields_within(series_id, &node, fields).await? {
            WriteOutcome::Applied => Ok(()),
            WriteOutcome::MissingDocument => bail!("Series not found: {}", series_id),
            WriteOutcome::MissingNode => {
                let id = node.segments().last().map(String::as_str).unwrap_or_default();
                bail!("{} not found: {}", what, id)
            }
        }
    }

    async fn unset(&self, series_id: &str, path: FieldPath) -> Result<()> {
        if !self.store.unset_fields(series_id, vec![path]).await? {
            bail!("Series not found: {}", series_id);
        }
        self.set(series_id, Vec::new()).await
    }
}

fn part<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str> {
    value.ok_or_else(|| anyhow!("Missing {} id", what))
}

fn season_parts(at: &CatalogCoordinates) -> Result<(&str, &str)> {
    Ok((part(at.lang(), "language")?, part(at.season(), "season")?))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::document::RedbCatalogStore;
    use redb::Database;
    use reelvault_storage::SeriesStorage;
    use tempfile::tempdir;

    pub(crate) fn test_catalog() -> (Catalog, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("catalog.db")).unwrap());
        let store = RedbCatalogStore::new(SeriesStorage::new(db).unwrap());
        (Catalog::new(Arc::new(store)), temp_dir)
    }

    /// Series with one language, one season and one batch quality.
    pub(crate) async fn seeded(catalog: &Catalog) -> CatalogCoordinates {
        let series = catalog.create_series(Series::new("Show")).await.unwrap();
        let lang = catalog.add_language(&series.id, "English").await.unwrap();
        let at = CatalogCoordinates::series(&series.id).with_lang(&lang);
        let season = catalog.add_season(&at, "Season 1").await.unwrap();
        let at = at.with_season(&season);
        let quality = catalog.add_batch_quality(&at, "720p").await.unwrap();
        at.with_quality(quality)
    }

    #[tokio::test]
    async fn test_build_tree() {
        let (catalog, _dir) = test_catalog();
        let at = seeded(&catalog).await;

        let series = catalog.require_series(&at.series_id).await.unwrap();
        let quality = series
            .batch_quality(
                at.lang().unwrap(),
                at.season().unwrap(),
                at.quality().unwrap(),
            )
            .unwrap();
        assert_eq!(quality.name, "720p");
        assert!(!quality.published);
        assert_eq!(series.language(at.lang().unwrap()).unwrap().name, "English");
    }

    #[tokio::test]
    async fn test_add_season_requires_language() {
        let (catalog, _dir) = test_catalog();
        let series = catalog.create_series(Series::new("Show")).await.unwrap();
        let at = CatalogCoordinates::series(&series.id).with_lang("missing");

        let err = catalog.add_season(&at, "Season 1").await.unwrap_err();
        assert!(err.to_string().contains("Language not found"));
    }

    #[tokio::test]
    async fn test_set_batch_range_publishes() {
        let (catalog, _dir) = test_catalog();
        let at = seeded(&catalog).await;

        catalog
            .set_batch_range(&at, -100999, 10, 19, "https://t.me/bot?start=get_100999_10_19")
            .await
            .unwrap();

        let series = catalog.require_series(&at.series_id).await.unwrap();
        let quality = series
            .batch_quality(
                at.lang().unwrap(),
                at.season().unwrap(),
                at.quality().unwrap(),
            )
            .unwrap();
        assert!(quality.is_live());
        assert_eq!(quality.first_msg_id, Some(10));
        assert_eq!(quality.last_msg_id, Some(19));
        assert_eq!(quality.canonical_channel_id, Some(-100999));
    }

    #[tokio::test]
    async fn test_range_for_deleted_quality_is_refused() {
        let (catalog, _dir) = test_catalog();
        let at = seeded(&catalog).await;

        catalog.delete_batch_quality(&at).await.unwrap();
        let err = catalog
            .set_batch_range(&at, -100999, 1, 5, "https://t.me/bot?start=get_100999_1_5")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Quality not found"));

        let series = catalog.require_series(&at.series_id).await.unwrap();
        let season = series
            .season(at.lang().unwrap(), at.season().unwrap())
            .unwrap();
        assert!(season.qualities.is_empty());
        assert_eq!(catalog.list_series().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_episode_file_for_deleted_language_is_refused() {
        let (catalog, _dir) = test_catalog();
        let at = seeded(&catalog).await;
        let season_at = CatalogCoordinates::series(&at.series_id)
            .with_lang(at.lang().unwrap())
            .with_season(at.season().unwrap());
        let episode = catalog.add_episode(&season_at, "Episode 1").await.unwrap();
        let episode_at = season_at.with_episode(&episode);
        let quality = catalog
            .add_episode_quality(&episode_at, "1080p")
            .await
            .unwrap();

        catalog.delete_language(&at).await.unwrap();
        assert!(
            catalog
                .set_episode_file(&episode_at.clone().with_quality(&quality), 9, "link")
                .await
                .is_err()
        );
        assert!(catalog.add_episode(&episode_at, "Episode 2").await.is_err());

        let series = catalog.require_series(&at.series_id).await.unwrap();
        assert!(series.languages.is_empty());
    }

    #[tokio::test]
    async fn test_publish_without_link_is_refused() {
        let (catalog, _dir) = test_catalog();
        let at = seeded(&catalog).await;

        let err = catalog.set_batch_published(&at, true).await.unwrap_err();
        assert!(err.to_string().contains("no batch link"));

        catalog.set_batch_published(&at, false).await.unwrap();
    }

    #[tokio::test]
    async fn test_episodes_and_clear() {
        let (catalog, _dir) = test_catalog();
        let at = seeded(&catalog).await;
        let season_at = CatalogCoordinates::series(&at.series_id)
            .with_lang(at.lang().unwrap())
            .with_season(at.season().unwrap());

        let episode = catalog.add_episode(&season_at, "Episode 1").await.unwrap();
        let episode_at = season_at.clone().with_episode(&episode);
        let quality = catalog
            .add_episode_quality(&episode_at, "1080p")
            .await
            .unwrap();
        catalog
            .set_episode_file(&episode_at.clone().with_quality(&quality), 77, "link")
            .await
            .unwrap();

        let series = catalog.require_series(&at.series_id).await.unwrap();
        let stored = series
            .episode(at.lang().unwrap(), at.season().unwrap(), &episode)
            .unwrap();
        assert!(stored.qualities[&quality].is_live());
        assert_eq!(stored.qualities[&quality].msg_id, Some(77));

        catalog.clear_episodes(&season_at).await.unwrap();
        let series = catalog.require_series(&at.series_id).await.unwrap();
        assert!(
            series
                .season(at.lang().unwrap(), at.season().unwrap())
                .unwrap()
                .episodes
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_delete_language_cascades() {
        let (catalog, _dir) = test_catalog();
        let at = seeded(&catalog).await;

        catalog.delete_language(&at).await.unwrap();
        let series = catalog.require_series(&at.series_id).await.unwrap();
        assert!(series.languages.is_empty());
    }

    #[tokio::test]
    async fn test_series_exists_and_recent() {
        let (catalog, _dir) = test_catalog();
        let mut first = Series::new("Dark").with_imdb_id("tt5753856");
        first.created_at = 1;
        first.published = true;
        let mut second = Series::new("Lost");
        second.created_at = 2;
        second.published = true;
        catalog.create_series(first).await.unwrap();
        catalog.create_series(second).await.unwrap();
        catalog.create_series(Series::new("Draft")).await.unwrap();

        assert!(catalog.series_exists(None, "  dark ").await.unwrap());
        assert!(
            catalog
                .series_exists(Some("tt5753856"), "Other title")
                .await
                .unwrap()
        );
        assert!(!catalog.series_exists(None, "Missing").await.unwrap());

        let recent = catalog.recent_series(5).await.unwrap();
        let titles: Vec<_> = recent.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Lost", "Dark"]);
    }

    #[tokio::test]
    async fn test_update_details_and_announcement_fields() {
        let (catalog, _dir) = test_catalog();
        let series = catalog.create_series(Series::new("Show")).await.unwrap();

        let details = SeriesDetails::parse("Title: Show Two\nYear: 2020").unwrap();
        catalog.update_details(&series.id, &details).await.unwrap();
        catalog
            .record_announcement(&series.id, 55, "digest")
            .await
            .unwrap();

        let stored = catalog.require_series(&series.id).await.unwrap();
        assert_eq!(stored.title, "Show Two");
        assert_eq!(stored.year.as_deref(), Some("2020"));
        assert_eq!(stored.announcement_message_id, Some(55));
        assert_eq!(stored.content_snapshot.as_deref(), Some("digest"));

        catalog.clear_announcement_message(&series.id).await.unwrap();
        let stored = catalog.require_series(&series.id).await.unwrap();
        assert_eq!(stored.announcement_message_id, None);
        assert_eq!(stored.content_snapshot.as_deref(), Some("digest"));
    }

    #[tokio::test]
    async fn test_mutating_missing_series_fails() {
        let (catalog, _dir) = test_catalog();
        assert!(catalog.set_published("ghost", true).await.is_err());
        assert!(catalog.add_language("ghost", "English").await.is_err());
    }
}
