//! Batch reference rows keyed `series:lang:season:quality`.

use anyhow::Result;

use crate::keys::{KEY_SEPARATOR, compose_key};
use crate::{SimpleStorage, define_simple_storage};

define_simple_storage! {
    /// Byte-level storage for replication reference rows.
    pub struct BatchMappingStorage { table: "batch_mappings" }
}

impl BatchMappingStorage {
    /// Key of the row for one batch quality.
    pub fn row_key(series_id: &str, lang_id: &str, season_id: &str, quality_id: &str) -> String {
        compose_key(&[series_id, lang_id, season_id, quality_id])
    }

    pub fn put_raw(&self, key: &str, data: &[u8]) -> Result<()> {
        <Self as SimpleStorage>::put_raw(self, key, data)
    }

    pub fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        <Self as SimpleStorage>::get_raw(self, key)
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        <Self as SimpleStorage>::delete(self, key)
    }

    pub fn list_all(&self) -> Result<Vec<(String, Vec<u8>)>> {
        self.list_raw()
    }

    /// All rows belonging to one series.
    pub fn list_for_series(&self, series_id: &str) -> Result<Vec<(String, Vec<u8>)>> {
        self.list_prefix_raw(&series_prefix(series_id))
    }

    /// Drop every row of a series, returning the number removed.
    pub fn delete_for_series(&self, series_id: &str) -> Result<usize> {
        self.delete_prefix(&series_prefix(series_id))
    }
}

fn series_prefix(series_id: &str) -> String {
    let mut prefix = compose_key(&[series_id]);
    prefix.push(KEY_SEPARATOR);
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::Database;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn setup() -> (BatchMappingStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("batch.db")).unwrap());
        (BatchMappingStorage::new(db).unwrap(), temp_dir)
    }

    #[test]
    fn test_list_for_series_is_prefix_scoped() {
        let (storage, _dir) = setup();
        let a = BatchMappingStorage::row_key("s1", "en", "s01", "720p");
        let b = BatchMappingStorage::row_key("s1", "en", "s01", "1080p");
        let other = BatchMappingStorage::row_key("s10", "en", "s01", "720p");
        storage.put_raw(&a, b"a").unwrap();
        storage.put_raw(&b, b"b").unwrap();
        storage.put_raw(&other, b"c").unwrap();

        let rows = storage.list_for_series("s1").unwrap();
        let keys: Vec<_> = rows.into_iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec![b.clone(), a.clone()]);
    }

    #[test]
    fn test_delete_for_series() {
        let (storage, _dir) = setup();
        storage
            .put_raw(&BatchMappingStorage::row_key("s1", "en", "s01", "720p"), b"a")
            .unwrap();
        storage
            .put_raw(&BatchMappingStorage::row_key("s2", "en", "s01", "720p"), b"b")
            .unwrap();

        assert_eq!(storage.delete_for_series("s1").unwrap(), 1);
        assert!(storage.list_for_series("s1").unwrap().is_empty());
        assert_eq!(storage.list_for_series("s2").unwrap().len(), 1);
    }
}
