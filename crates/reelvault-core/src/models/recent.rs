use serde::{Deserialize, Serialize};

/// Entries kept on the recently-added list.
pub const MAX_RECENT_ENTRIES: usize = 10;

/// One line of the list: a series and what was last published for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentEntry {
    pub series_id: String,
    pub title: String,
    /// Compact season/episode summary, e.g. `S01E01-E05`.
    pub info: String,
    pub added_at: i64,
}

/// The recently-added list and where it is posted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecentList {
    #[serde(default)]
    pub channel_id: Option<i64>,
    #[serde(default)]
    pub message_id: Option<i64>,
    /// Newest first.
    #[serde(default)]
    pub entries: Vec<RecentEntry>,
}

impl RecentList {
    /// Move the series to the top with its new summary, dropping the oldest
    /// entry past the cap.
    pub fn upsert(&mut self, series_id: &str, title: &str, info: &str) {
        self.entries.retain(|entry| entry.series_id != series_id);
        self.entries.insert(
            0,
            RecentEntry {
                series_id: series_id.to_string(),
                title: title.to_string(),
                info: info.to_string(),
                added_at: chrono::Utc::now().timestamp_millis(),
            },
        );
        self.entries.truncate(MAX_RECENT_ENTRIES);
    }

    pub fn remove(&mut self, series_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.series_id != series_id);
        self.entries.len() != before
    }
}
