//! Error taxonomy for the ingestion and distribution pipeline.

use std::time::Duration;
use thiserror::Error;

/// Failures signaled by the messaging transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Provider-imposed wait. Always retried, then the unit of work is skipped.
    #[error("Rate limited, retry after {}s", .0.as_secs())]
    RateLimited(Duration),

    /// The addressed message does not exist (deleted or never existed).
    #[error("Message not found: {0}")]
    NotFound(String),

    /// An edit carried the same content as the current message.
    #[error("Message is not modified")]
    NotModified,

    #[error("Telegram API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TransportError::RateLimited(_))
    }

    /// Wait requested by the provider, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TransportError::RateLimited(wait) => Some(*wait),
            _ => None,
        }
    }
}

/// Malformed or foreign range links.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("Invalid link '{token}': {reason}")]
    InvalidLink { token: String, reason: String },

    #[error("Link points to unknown channel {0}")]
    UnknownChannel(i64),
}

impl LinkError {
    pub(crate) fn invalid(token: &str, reason: impl Into<String>) -> Self {
        LinkError::InvalidLink {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

/// Rejected admin session input. The session is held unless noted otherwise.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("{0}")]
    Validation(String),
}

/// Batch or single-file replication that could not complete.
#[derive(Error, Debug)]
pub enum ReplicationError {
    #[error("No messages could be fetched from channel {channel_id}")]
    NothingFetched { channel_id: i64 },

    #[error("None of the {fetched} fetched messages could be copied")]
    NothingCopied { fetched: usize },

    #[error("Catalog node not found: {0}")]
    MissingNode(String),

    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Failed lookups against a metadata provider.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("{provider} returned HTTP {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("{provider}: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid request URL: {0}")]
    Url(String),
}

/// Convenience alias for transport calls.
pub type TransportResult<T> = std::result::Result<T, TransportError>;
