//! ReelVault Storage - byte-level persistence on redb.
//!
//! Every table is a `&str -> &[u8]` map. Typed wrappers live in
//! `reelvault-core`, which owns the models.
//!
//! # Tables
//!
//! - `series` - series documents (JSON)
//! - `batch_mappings` - replication reference rows, keyed `series:lang:season:quality`
//! - `caption_templates` - per-admin caption templates
//! - `recent_lists` - the recently-added list posted to a channel

pub mod batch_mapping;
pub mod caption_template;
pub mod keys;
pub mod recent_list;
pub mod series;
mod simple_storage;

use anyhow::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use batch_mapping::BatchMappingStorage;
pub use caption_template::CaptionTemplateStorage;
pub use recent_list::RecentListStorage;
pub use series::SeriesStorage;
pub use simple_storage::SimpleStorage;

/// Opens the database and every table.
pub struct Storage {
    db: Arc<Database>,
    pub series: SeriesStorage,
    pub batch_mappings: BatchMappingStorage,
    pub caption_templates: CaptionTemplateStorage,
    pub recent_lists: RecentListStorage,
}

impl Storage {
    /// Create the database file if needed and initialize all tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_db(Arc::new(Database::create(path)?))
    }

    pub fn from_db(db: Arc<Database>) -> Result<Self> {
        Ok(Self {
            series: SeriesStorage::new(db.clone())?,
            batch_mappings: BatchMappingStorage::new(db.clone())?,
            caption_templates: CaptionTemplateStorage::new(db.clone())?,
            recent_lists: RecentListStorage::new(db.clone())?,
            db,
        })
    }

    pub fn get_db(&self) -> Arc<Database> {
        self.db.clone()
    }
}
