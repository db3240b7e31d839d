pub mod catalog;
pub mod recent;
pub mod replication;

pub use catalog::{
    BatchQuality, CatalogCoordinates, Episode, EpisodeQuality, Language, Season, Series,
    SeriesDetails, new_node_id,
};
pub use recent::{MAX_RECENT_ENTRIES, RecentEntry, RecentList};
pub use replication::{
    BatchMapping, CopiedMessage, ReplicationResult, SkipReason, SkippedMessage, UnitReport,
};
