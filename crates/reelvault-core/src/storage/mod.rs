//! Typed storage over `reelvault-storage`.

pub mod batch_mapping;
pub mod caption_template;
pub mod catalog;
pub mod document;
pub mod path;
pub mod recent_list;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub use batch_mapping::BatchMappingStore;
pub use caption_template::CaptionTemplateStore;
pub use catalog::Catalog;
pub use document::{CatalogStore, DocumentFilter, RedbCatalogStore, WriteOutcome};
pub use path::FieldPath;
pub use recent_list::RecentListStore;

/// Every typed store, opened over one database.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Catalog,
    pub batch_mappings: BatchMappingStore,
    pub caption_templates: CaptionTemplateStore,
    pub recent_lists: RecentListStore,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>, default_caption_template: &str) -> Result<Self> {
        let raw = reelvault_storage::Storage::new(path)?;
        Ok(Self::from_raw(raw, default_caption_template))
    }

    pub fn from_raw(raw: reelvault_storage::Storage, default_caption_template: &str) -> Self {
        Self {
            catalog: Catalog::new(Arc::new(RedbCatalogStore::new(raw.series))),
            batch_mappings: BatchMappingStore::new(raw.batch_mappings),
            caption_templates: CaptionTemplateStore::new(
                raw.caption_templates,
                default_caption_template,
            ),
            recent_lists: RecentListStore::new(raw.recent_lists),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    /// Full storage over a throwaway database with the stock caption template.
    pub(crate) fn test_storage() -> (Storage, TempDir) {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::open(
            temp_dir.path().join("reelvault.db"),
            crate::caption::DEFAULT_CAPTION_TEMPLATE,
        )
        .unwrap();
        (storage, temp_dir)
    }

    #[tokio::test]
    async fn test_open_shares_one_database() {
        let (storage, _dir) = test_storage();
        let series = storage
            .catalog
            .create_series(crate::models::Series::new("Dark"))
            .await
            .unwrap();
        storage.caption_templates.set(7, "{filename}").unwrap();

        assert!(storage.catalog.get_series(&series.id).await.unwrap().is_some());
        assert_eq!(storage.caption_templates.effective(7), "{filename}");
        assert_eq!(
            storage.caption_templates.effective(8),
            crate::caption::DEFAULT_CAPTION_TEMPLATE
        );
    }
}
