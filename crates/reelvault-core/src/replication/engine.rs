//! Batch replication: fetch a captured source range, rewrite file captions,
//! copy everything into the canonical channel in source order, and record
//! the resulting range on the catalog.

use std::sync::Arc;
use tracing::{info, warn};

use super::fetch::fetch_in_chunks;
use super::retry::RetryPolicy;
use crate::announce::{AnnounceOutcome, Announcer};
use crate::caption::{CaptionContext, render_caption};
use crate::config::ReplicationConfig;
use crate::error::{ReplicationError, TransportError};
use crate::link::{DeepLinks, MAX_RANGE_MESSAGES, RangeAddress, expand_range};
use crate::models::{
    BatchMapping, CatalogCoordinates, CopiedMessage, ReplicationResult, UnitReport,
};
use crate::storage::Storage;
use crate::transport::{SourceMessage, Transport};

/// A captured source range bound to a batch quality node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    /// Admin whose caption template applies.
    pub admin_id: i64,
    pub coordinates: CatalogCoordinates,
    pub source_channel_id: i64,
    pub first_id: i64,
    pub last_id: i64,
}

/// A single file bound to an episode quality node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeFileJob {
    pub admin_id: i64,
    pub coordinates: CatalogCoordinates,
    pub message: SourceMessage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationReport {
    pub result: ReplicationResult,
    pub share_link: String,
    /// Copies in source order; skipped holds ids lost at fetch or copy.
    pub copies: UnitReport<CopiedMessage>,
    /// Whether the canonical ids came out without gaps.
    pub contiguous: bool,
    /// `None` when announcing failed; the catalog update stands regardless.
    pub announcement: Option<AnnounceOutcome>,
}

impl ReplicationReport {
    /// One-paragraph summary for the admin.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Copied {} message(s) into {} (ids {}-{}).",
            self.result.copied_count,
            self.result.canonical_channel_id,
            self.result.canonical_first_id,
            self.result.canonical_last_id
        );
        if self.copies.is_partial() {
            text.push_str(&format!(
                "\nSkipped {} message(s).",
                self.copies.skipped.len()
            ));
        }
        if !self.contiguous {
            text.push_str("\nThe canonical range has foreign posts in between.");
        }
        text.push_str(&format!("\nLink: {}", self.share_link));
        text
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeFileReport {
    pub message_id: i64,
    pub file_link: String,
    pub announcement: Option<AnnounceOutcome>,
}

pub struct BatchReplicationEngine {
    transport: Arc<dyn Transport>,
    storage: Storage,
    announcer: Arc<Announcer>,
    links: DeepLinks,
    canonical_channel_id: i64,
    chunk_size: usize,
    policy: RetryPolicy,
}

impl BatchReplicationEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        storage: Storage,
        announcer: Arc<Announcer>,
        links: DeepLinks,
        canonical_channel_id: i64,
        config: &ReplicationConfig,
    ) -> Self {
        Self {
            transport,
            storage,
            announcer,
            links,
            canonical_channel_id,
            chunk_size: config.chunk_size,
            policy: config.retry_policy(),
        }
    }

    /// Replicate a source range into the canonical channel.
    ///
    /// Nothing in the catalog changes unless at least one message was copied.
    /// Skipped messages leave gaps and are reported, not rolled back. When the
    /// copies land with foreign posts in between, the exact ids are kept on
    /// the reference row so relaying the link skips those posts.
    pub async fn replicate_batch(
        &self,
        job: &BatchJob,
    ) -> Result<ReplicationReport, ReplicationError> {
        let at = &job.coordinates;
        let span = RangeAddress::new(job.source_channel_id, job.first_id, job.last_id).len();
        if span > MAX_RANGE_MESSAGES {
            return Err(ReplicationError::Validation(format!(
                "A batch can hold at most {} messages, this one spans {}",
                MAX_RANGE_MESSAGES, span
            )));
        }
        let context = self.batch_context(at).await?;
        let ids = expand_range(job.first_id, job.last_id);
        info!(
            "Replicating {} message(s) {}..{} from {} for series {}",
            ids.len(),
            job.first_id,
            job.last_id,
            job.source_channel_id,
            at.series_id
        );

        let fetched = fetch_in_chunks(
            self.transport.as_ref(),
            job.source_channel_id,
            &ids,
            self.chunk_size,
            &self.policy,
        )
        .await;
        if fetched.succeeded.is_empty() {
            return Err(ReplicationError::NothingFetched {
                channel_id: job.source_channel_id,
            });
        }

        let template = self.storage.caption_templates.effective(job.admin_id);
        let mut copies = UnitReport {
            succeeded: Vec::with_capacity(fetched.succeeded.len()),
            skipped: fetched.skipped,
        };
        for message in &fetched.succeeded {
            match self.copy_one(message, &template, &context).await {
                Ok(canonical_id) => copies.succeeded.push(CopiedMessage {
                    source_id: message.message_id,
                    canonical_id,
                }),
                Err(e) => {
                    warn!("Skipping message {}: {}", message.message_id, e);
                    copies.skip(message.message_id, e.into());
                }
            }
        }

        let (Some(first), Some(last)) = (copies.succeeded.first(), copies.succeeded.last()) else {
            return Err(ReplicationError::NothingCopied {
                fetched: fetched.succeeded.len(),
            });
        };
        let result = ReplicationResult {
            source_channel_id: job.source_channel_id,
            source_first_id: job.first_id,
            source_last_id: job.last_id,
            canonical_channel_id: self.canonical_channel_id,
            canonical_first_id: first.canonical_id,
            canonical_last_id: last.canonical_id,
            copied_count: copies.succeeded.len(),
        };

        let canonical_ids: Vec<i64> = copies.succeeded.iter().map(|c| c.canonical_id).collect();
        let contiguous = is_contiguous(&canonical_ids);
        if !contiguous {
            warn!(
                "Canonical ids {}..{} are not contiguous ({} copies over a span of {})",
                result.canonical_first_id,
                result.canonical_last_id,
                result.copied_count,
                result.canonical_span()
            );
        }

        let share_link = self.links.range(&RangeAddress::new(
            self.canonical_channel_id,
            result.canonical_first_id,
            result.canonical_last_id,
        ));
        self.record_mapping(at, &result, (!contiguous).then_some(canonical_ids))?;
        if let Err(e) = self
            .storage
            .catalog
            .set_batch_range(
                at,
                self.canonical_channel_id,
                result.canonical_first_id,
                result.canonical_last_id,
                &share_link,
            )
            .await
        {
            self.forget_mapping(at);
            return Err(e.into());
        }

        info!(
            "Replicated {} of {} message(s) into {}..{}",
            result.copied_count,
            ids.len(),
            result.canonical_first_id,
            result.canonical_last_id
        );
        let announcement = self.announce(&at.series_id).await;
        Ok(ReplicationReport {
            result,
            share_link,
            copies,
            contiguous,
            announcement,
        })
    }

    /// Copy one file into the canonical channel and publish it on an episode quality.
    pub async fn replicate_episode_file(
        &self,
        job: &EpisodeFileJob,
    ) -> Result<EpisodeFileReport, ReplicationError> {
        let at = &job.coordinates;
        let context = self.episode_context(at).await?;
        if job.message.file.is_none() {
            return Err(ReplicationError::Validation(
                "Send the episode as a file or video".to_string(),
            ));
        }

        let template = self.storage.caption_templates.effective(job.admin_id);
        let message_id = self
            .copy_one(&job.message, &template, &context)
            .await
            .map_err(|e| {
                warn!("Copy of episode file {} failed: {}", job.message.message_id, e);
                ReplicationError::NothingCopied { fetched: 1 }
            })?;

        let file_link = self
            .links
            .range(&RangeAddress::single(self.canonical_channel_id, message_id));
        self.storage
            .catalog
            .set_episode_file(at, message_id, &file_link)
            .await?;
        info!("Stored episode file {} for series {}", message_id, at.series_id);

        let announcement = self.announce(&at.series_id).await;
        Ok(EpisodeFileReport {
            message_id,
            file_link,
            announcement,
        })
    }

    async fn copy_one(
        &self,
        message: &SourceMessage,
        template: &str,
        context: &CaptionContext,
    ) -> Result<i64, TransportError> {
        let caption = message.captionable_file().map(|file| {
            render_caption(
                template,
                file.display_name(),
                message.caption.as_deref().unwrap_or_default(),
                context,
            )
        });
        self.policy
            .run(&format!("copy of {}", message.message_id), || {
                self.transport
                    .copy_message(message, self.canonical_channel_id, caption.as_deref())
            })
            .await
    }

    async fn batch_context(&self, at: &CatalogCoordinates) -> Result<CaptionContext, ReplicationError> {
        let series = self.storage.catalog.require_series(&at.series_id).await?;
        let (lang_id, season_id, quality_id) = match (at.lang(), at.season(), at.quality()) {
            (Some(lang), Some(season), Some(quality)) => (lang, season, quality),
            _ => return Err(ReplicationError::MissingNode(node_label(at))),
        };
        let language = series
            .language(lang_id)
            .ok_or_else(|| ReplicationError::MissingNode(node_label(at)))?;
        let season = series
            .season(lang_id, season_id)
            .ok_or_else(|| ReplicationError::MissingNode(node_label(at)))?;
        let quality = series
            .batch_quality(lang_id, season_id, quality_id)
            .ok_or_else(|| ReplicationError::MissingNode(node_label(at)))?;

        Ok(CaptionContext::default()
            .with_series_name(&series.title)
            .with_language(&language.name)
            .with_season(&season.name)
            .with_quality(&quality.name))
    }

    async fn episode_context(
        &self,
        at: &CatalogCoordinates,
    ) -> Result<CaptionContext, ReplicationError> {
        let series = self.storage.catalog.require_series(&at.series_id).await?;
        let (lang_id, season_id, episode_id, quality_id) =
            match (at.lang(), at.season(), at.episode(), at.quality()) {
                (Some(lang), Some(season), Some(episode), Some(quality)) => {
                    (lang, season, episode, quality)
                }
                _ => return Err(ReplicationError::MissingNode(node_label(at))),
            };
        let missing = || ReplicationError::MissingNode(node_label(at));
        let language = series.language(lang_id).ok_or_else(missing)?;
        let season = series.season(lang_id, season_id).ok_or_else(missing)?;
        let episode = series
            .episode(lang_id, season_id, episode_id)
            .ok_or_else(missing)?;
        let quality = episode.qualities.get(quality_id).ok_or_else(missing)?;

        Ok(CaptionContext::default()
            .with_series_name(&series.title)
            .with_language(&language.name)
            .with_season(&season.name)
            .with_episode(&episode.name)
            .with_quality(&quality.name))
    }

    /// Stored before the catalog link so a gapped range is never relayed
    /// without its id list.
    fn record_mapping(
        &self,
        at: &CatalogCoordinates,
        result: &ReplicationResult,
        canonical_ids: Option<Vec<i64>>,
    ) -> anyhow::Result<()> {
        let (Some(lang), Some(season), Some(quality)) = (at.lang(), at.season(), at.quality())
        else {
            return Ok(());
        };
        let mut mapping = BatchMapping::new(&at.series_id, lang, season, quality, result.clone());
        if let Some(ids) = canonical_ids {
            mapping = mapping.with_canonical_ids(ids);
        }
        self.storage.batch_mappings.upsert(mapping)
    }

    fn forget_mapping(&self, at: &CatalogCoordinates) {
        let (Some(lang), Some(season), Some(quality)) = (at.lang(), at.season(), at.quality())
        else {
            return;
        };
        if let Err(e) = self
            .storage
            .batch_mappings
            .delete(&at.series_id, lang, season, quality)
        {
            warn!("Failed to drop batch mapping for {}: {}", at.series_id, e);
        }
    }

    async fn announce(&self, series_id: &str) -> Option<AnnounceOutcome> {
        match self.announcer.announce(series_id).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("Announcement for {} failed: {}", series_id, e);
                None
            }
        }
    }
}

fn is_contiguous(ids: &[i64]) -> bool {
    ids.windows(2).all(|pair| pair[1] == pair[0] + 1)
}

fn node_label(at: &CatalogCoordinates) -> String {
    [
        Some(at.series_id.as_str()),
        at.lang(),
        at.season(),
        at.episode(),
        at.quality(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join("/")
}
