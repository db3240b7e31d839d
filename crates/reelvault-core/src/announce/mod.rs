//! Announcements: a best-effort projection of a series' live content into
//! the announcement channel.

pub mod recent;
pub mod render;
pub mod snapshot;

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::models::Series;
use crate::replication::RetryPolicy;
use crate::storage::Catalog;
use crate::transport::Transport;

pub use recent::{RecentBoard, recent_info, render_recent_list};
pub use render::render_announcement;
pub use snapshot::{content_digest, published_view, should_announce};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCause {
    NotPublished,
    NoChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    Skipped(SkipCause),
    /// The stored digest matches; nothing was sent.
    Unchanged,
    Edited { message_id: i64 },
    Sent { message_id: i64 },
}

pub struct Announcer {
    transport: Arc<dyn Transport>,
    catalog: Catalog,
    channel_id: Option<i64>,
    policy: RetryPolicy,
    recent: Option<Arc<RecentBoard>>,
}

impl Announcer {
    pub fn new(
        transport: Arc<dyn Transport>,
        catalog: Catalog,
        channel_id: Option<i64>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            catalog,
            channel_id,
            policy,
            recent: None,
        }
    }

    /// Keep the recently-added list in step with announcements.
    pub fn with_recent_board(mut self, board: Arc<RecentBoard>) -> Self {
        self.recent = Some(board);
        self
    }

    /// Send or edit the announcement of a published series when its live
    /// content changed since the last successful announcement.
    pub async fn announce(&self, series_id: &str) -> Result<AnnounceOutcome> {
        let Some(channel_id) = self.channel_id else {
            debug!("No announcement channel configured");
            return Ok(AnnounceOutcome::Skipped(SkipCause::NoChannel));
        };
        let series = self.catalog.require_series(series_id).await?;
        if !series.published {
            return Ok(AnnounceOutcome::Skipped(SkipCause::NotPublished));
        }

        let digest = content_digest(&series);
        if !should_announce(series.content_snapshot.as_deref(), &digest) {
            debug!("Announcement for {} is up to date", series.title);
            return Ok(AnnounceOutcome::Unchanged);
        }
        let text = render_announcement(&series);

        if let Some(message_id) = series.announcement_message_id {
            let edited = self
                .policy
                .run("edit announcement", || {
                    self.transport.edit_message(channel_id, message_id, &text)
                })
                .await;
            match edited {
                Ok(()) | Err(TransportError::NotModified) => {
                    self.catalog
                        .record_announcement(series_id, message_id, &digest)
                        .await?;
                    info!("Updated announcement {} for {}", message_id, series.title);
                    self.note_recent(&series).await;
                    return Ok(AnnounceOutcome::Edited { message_id });
                }
                Err(TransportError::NotFound(_)) => {
                    warn!(
                        "Announcement {} for {} is gone, sending a new one",
                        message_id, series.title
                    );
                    self.catalog.clear_announcement(series_id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let message_id = self
            .policy
            .run("send announcement", || {
                self.transport.send_message(channel_id, &text)
            })
            .await?;
        self.catalog
            .record_announcement(series_id, message_id, &digest)
            .await?;
        info!("Sent announcement {} for {}", message_id, series.title);
        self.note_recent(&series).await;
        Ok(AnnounceOutcome::Sent { message_id })
    }

    async fn note_recent(&self, series: &Series) {
        if let Some(board) = &self.recent
            && let Err(e) = board.record(series).await
        {
            warn!("Recent list update for {} failed: {}", series.title, e);
        }
    }

    /// Delete the announcement of a series and forget it, so a later publish
    /// announces afresh. Returns whether a message was on record.
    pub async fn withdraw(&self, series_id: &str) -> Result<bool> {
        if let Some(board) = &self.recent
            && let Err(e) = board.forget(series_id).await
        {
            warn!("Dropping {} from the recent list failed: {}", series_id, e);
        }
        let Some(series) = self.catalog.get_series(series_id).await? else {
            return Ok(false);
        };
        let (Some(channel_id), Some(message_id)) =
            (self.channel_id, series.announcement_message_id)
        else {
            if series.content_snapshot.is_some() {
                self.catalog.clear_announcement(series_id).await?;
            }
            return Ok(false);
        };

        match self
            .transport
            .delete_messages(channel_id, &[message_id])
            .await
        {
            Ok(()) | Err(TransportError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        self.catalog.clear_announcement(series_id).await?;
        info!("Withdrew announcement {} for {}", message_id, series.title);
        Ok(true)
    }
}
