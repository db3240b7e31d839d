use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Why a message was left out of a replication or relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Still rate limited after the retry budget was spent.
    RateLimited,
    /// Deleted or never existed in the source channel.
    NotFound,
    /// Any other transport failure.
    Failed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::RateLimited => write!(f, "rate limited"),
            SkipReason::NotFound => write!(f, "not found"),
            SkipReason::Failed(reason) => write!(f, "{}", reason),
        }
    }
}

impl From<TransportError> for SkipReason {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::RateLimited(_) => SkipReason::RateLimited,
            TransportError::NotFound(_) => SkipReason::NotFound,
            other => SkipReason::Failed(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedMessage {
    pub message_id: i64,
    pub reason: SkipReason,
}

impl SkippedMessage {
    pub fn new(message_id: i64, reason: SkipReason) -> Self {
        Self { message_id, reason }
    }
}

/// Outcome of a continue-on-error loop: what went through and what did not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitReport<T> {
    pub succeeded: Vec<T>,
    pub skipped: Vec<SkippedMessage>,
}

impl<T> Default for UnitReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> UnitReport<T> {
    pub fn skip(&mut self, message_id: i64, reason: SkipReason) {
        self.skipped.push(SkippedMessage::new(message_id, reason));
    }

    pub fn skipped_ids(&self) -> Vec<i64> {
        self.skipped.iter().map(|skip| skip.message_id).collect()
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// A source message and the canonical copy it produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CopiedMessage {
    pub source_id: i64,
    pub canonical_id: i64,
}

/// Value object describing one completed batch replication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicationResult {
    pub source_channel_id: i64,
    pub source_first_id: i64,
    pub source_last_id: i64,
    pub canonical_channel_id: i64,
    pub canonical_first_id: i64,
    pub canonical_last_id: i64,
    pub copied_count: usize,
}

impl ReplicationResult {
    /// Number of ids the canonical range spans.
    pub fn canonical_span(&self) -> usize {
        (self.canonical_last_id - self.canonical_first_id).unsigned_abs() as usize + 1
    }
}

/// Audit row kept per batch quality. The catalog node stays authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchMapping {
    pub series_id: String,
    pub lang_id: String,
    pub season_id: String,
    pub quality_id: String,
    pub result: ReplicationResult,
    /// Canonical ids when the copies did not land contiguously.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_ids: Option<Vec<i64>>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl BatchMapping {
    pub fn new(
        series_id: impl Into<String>,
        lang_id: impl Into<String>,
        season_id: impl Into<String>,
        quality_id: impl Into<String>,
        result: ReplicationResult,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            series_id: series_id.into(),
            lang_id: lang_id.into(),
            season_id: season_id.into(),
            quality_id: quality_id.into(),
            result,
            canonical_ids: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_canonical_ids(mut self, ids: Vec<i64>) -> Self {
        self.canonical_ids = Some(ids);
        self
    }
}
