//! Replication of source-channel content into the canonical channel.

pub mod engine;
pub mod fetch;
pub mod retry;

pub use engine::{
    BatchJob, BatchReplicationEngine, EpisodeFileJob, EpisodeFileReport, ReplicationReport,
};
pub use fetch::{DEFAULT_CHUNK_SIZE, fetch_in_chunks};
pub use retry::RetryPolicy;
