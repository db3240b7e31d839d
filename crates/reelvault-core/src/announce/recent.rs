//! The "recently added" list: one channel message naming the last series
//! that received new content, edited in place as series are announced.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::snapshot::{PublishedSeason, published_view};
use crate::error::TransportError;
use crate::html::escape_html;
use crate::models::{RecentList, Series};
use crate::replication::RetryPolicy;
use crate::storage::RecentListStore;
use crate::transport::Transport;

const HEADER: &str = "⚡ <b>Recently Added Series</b> ⚡";

/// Compact summary of what is live: `S01`, `S01E03`, `S01E01-E05`,
/// `S01E01,E04` or `S01,S02E01`. Empty when nothing is live.
pub fn recent_info(series: &Series) -> String {
    let mut parts: Vec<String> = Vec::new();
    for language in published_view(series) {
        for season in &language.seasons {
            let part = season_part(season);
            if !parts.contains(&part) {
                parts.push(part);
            }
        }
    }
    parts.join(",")
}

fn season_part(season: &PublishedSeason) -> String {
    let code = match season.number {
        Some(number) => format!("S{:02}", number),
        None => season.name.clone(),
    };
    if season.episodes.is_empty() {
        return code;
    }

    let mut numbers: Vec<u32> = season.episodes.iter().filter_map(|e| e.number).collect();
    if numbers.is_empty() {
        let names: Vec<&str> = season.episodes.iter().map(|e| e.name.as_str()).collect();
        return format!("{}{}", code, names.join(","));
    }
    numbers.sort_unstable();
    numbers.dedup();

    let (first, last) = (numbers[0], numbers[numbers.len() - 1]);
    let episodes = if numbers.len() == 1 {
        format!("E{:02}", first)
    } else if (last - first) as usize + 1 == numbers.len() {
        format!("E{:02}-E{:02}", first, last)
    } else {
        numbers
            .iter()
            .map(|n| format!("E{:02}", n))
            .collect::<Vec<_>>()
            .join(",")
    };
    format!("{}{}", code, episodes)
}

pub fn render_recent_list(list: &RecentList) -> String {
    if list.entries.is_empty() {
        return format!("{}\n\n<i>No series added yet.</i>", HEADER);
    }
    let mut text = format!("{}\n", HEADER);
    for (i, entry) in list.entries.iter().enumerate() {
        text.push_str(&format!("\n{}. <b>{}</b>", i + 1, escape_html(&entry.title)));
        if !entry.info.is_empty() {
            text.push(' ');
            text.push_str(&escape_html(&entry.info));
        }
    }
    text
}

pub struct RecentBoard {
    transport: Arc<dyn Transport>,
    store: RecentListStore,
    policy: RetryPolicy,
}

impl RecentBoard {
    pub fn new(transport: Arc<dyn Transport>, store: RecentListStore, policy: RetryPolicy) -> Self {
        Self {
            transport,
            store,
            policy,
        }
    }

    /// Post the list as a new message in `channel_id` and make that the
    /// message later updates edit.
    pub async fn post(&self, channel_id: i64) -> Result<i64> {
        let list = self.store.update(|list| {
            if list.channel_id != Some(channel_id) {
                list.message_id = None;
            }
            list.channel_id = Some(channel_id);
        })?;
        let text = render_recent_list(&list);
        let message_id = self
            .policy
            .run("send recent list", || {
                self.transport.send_message(channel_id, &text)
            })
            .await?;
        self.store.update(|list| list.message_id = Some(message_id))?;
        info!("Posted recent list {} in {}", message_id, channel_id);
        Ok(message_id)
    }

    /// Put a freshly announced series on top and refresh the posted list.
    /// Returns false when there was nothing live to list.
    pub async fn record(&self, series: &Series) -> Result<bool> {
        let info = recent_info(series);
        if !series.published || info.is_empty() {
            return Ok(false);
        }
        let list = self
            .store
            .update(|list| list.upsert(&series.id, &series.title, &info))?;
        self.refresh(list).await?;
        Ok(true)
    }

    /// Drop a series from the list, refreshing the posted message if it was on it.
    pub async fn forget(&self, series_id: &str) -> Result<bool> {
        let mut removed = false;
        let list = self.store.update(|list| removed = list.remove(series_id))?;
        if removed {
            self.refresh(list).await?;
        }
        Ok(removed)
    }

    /// Edit the posted message, or send a new one when it is gone.
    async fn refresh(&self, list: RecentList) -> Result<()> {
        let Some(channel_id) = list.channel_id else {
            debug!("No recent-list channel set yet");
            return Ok(());
        };
        let text = render_recent_list(&list);

        if let Some(message_id) = list.message_id {
            let edited = self
                .policy
                .run("edit recent list", || {
                    self.transport.edit_message(channel_id, message_id, &text)
                })
                .await;
            match edited {
                Ok(()) | Err(TransportError::NotModified) => return Ok(()),
                Err(e) => {
                    warn!(
                        "Could not edit recent list {} ({}), sending a new one",
                        message_id, e
                    );
                    self.store.update(|list| list.message_id = None)?;
                }
            }
        }

        let message_id = self
            .policy
            .run("send recent list", || {
                self.transport.send_message(channel_id, &text)
            })
            .await?;
        self.store.update(|list| list.message_id = Some(message_id))?;
        info!("Sent recent list {} in {}", message_id, channel_id);
        Ok(())
    }
}
