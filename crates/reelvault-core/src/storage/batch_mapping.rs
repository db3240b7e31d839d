//! Typed wrapper for replication reference rows.

use anyhow::Result;
use reelvault_storage::BatchMappingStorage;

use crate::models::BatchMapping;

#[derive(Debug, Clone)]
pub struct BatchMappingStore {
    inner: BatchMappingStorage,
}

impl BatchMappingStore {
    pub fn new(inner: BatchMappingStorage) -> Self {
        Self { inner }
    }

    /// Insert or replace the row for this batch quality, keeping `created_at`.
    pub fn upsert(&self, mut mapping: BatchMapping) -> Result<()> {
        let key = key_of(&mapping);
        if let Some(existing) = self.get_by_key(&key)? {
            mapping.created_at = existing.created_at;
        }
        mapping.updated_at = chrono::Utc::now().timestamp_millis();
        self.inner.put_raw(&key, &serde_json::to_vec(&mapping)?)
    }

    pub fn get(
        &self,
        series_id: &str,
        lang_id: &str,
        season_id: &str,
        quality_id: &str,
    ) -> Result<Option<BatchMapping>> {
        self.get_by_key(&BatchMappingStorage::row_key(
            series_id, lang_id, season_id, quality_id,
        ))
    }

    pub fn delete(
        &self,
        series_id: &str,
        lang_id: &str,
        season_id: &str,
        quality_id: &str,
    ) -> Result<bool> {
        self.inner.delete(&BatchMappingStorage::row_key(
            series_id, lang_id, season_id, quality_id,
        ))
    }

    pub fn list_for_series(&self, series_id: &str) -> Result<Vec<BatchMapping>> {
        self.inner
            .list_for_series(series_id)?
            .into_iter()
            .map(|(_, bytes)| Ok(serde_json::from_slice(&bytes)?))
            .collect()
    }

    /// Row whose canonical copies landed with gaps and span exactly this range.
    pub fn find_sparse(
        &self,
        channel_id: i64,
        first_id: i64,
        last_id: i64,
    ) -> Result<Option<BatchMapping>> {
        for (key, bytes) in self.inner.list_all()? {
            let mapping: BatchMapping = match serde_json::from_slice(&bytes) {
                Ok(mapping) => mapping,
                Err(e) => {
                    tracing::warn!("Skipping unreadable batch mapping {}: {}", key, e);
                    continue;
                }
            };
            let result = &mapping.result;
            if mapping.canonical_ids.is_some()
                && result.canonical_channel_id == channel_id
                && result.canonical_first_id == first_id
                && result.canonical_last_id == last_id
            {
                return Ok(Some(mapping));
            }
        }
        Ok(None)
    }

    pub fn delete_for_series(&self, series_id: &str) -> Result<usize> {
        self.inner.delete_for_series(series_id)
    }

    fn get_by_key(&self, key: &str) -> Result<Option<BatchMapping>> {
        match self.inner.get_raw(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

fn key_of(mapping: &BatchMapping) -> String {
    BatchMappingStorage::row_key(
        &mapping.series_id,
        &mapping.lang_id,
        &mapping.season_id,
        &mapping.quality_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReplicationResult;
    use redb::Database;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn setup() -> (BatchMappingStore, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("mappings.db")).unwrap());
        let store = BatchMappingStore::new(BatchMappingStorage::new(db).unwrap());
        (store, temp_dir)
    }

    fn mapping(quality: &str, copied: usize) -> BatchMapping {
        BatchMapping::new(
            "s1",
            "en",
            "s01",
            quality,
            ReplicationResult {
                source_channel_id: -100111,
                source_first_id: 1,
                source_last_id: copied as i64,
                canonical_channel_id: -100999,
                canonical_first_id: 100,
                canonical_last_id: 99 + copied as i64,
                copied_count: copied,
            },
        )
    }

    #[test]
    fn test_upsert_keeps_created_at() {
        let (store, _dir) = setup();
        let mut first = mapping("720p", 5);
        first.created_at = 10;
        store.upsert(first).unwrap();
        store.upsert(mapping("720p", 8)).unwrap();

        let stored = store.get("s1", "en", "s01", "720p").unwrap().unwrap();
        assert_eq!(stored.created_at, 10);
        assert_eq!(stored.result.copied_count, 8);
    }

    #[test]
    fn test_list_and_delete_for_series() {
        let (store, _dir) = setup();
        store.upsert(mapping("720p", 5)).unwrap();
        store
            .upsert(mapping("1080p", 5).with_canonical_ids(vec![100, 102, 103]))
            .unwrap();

        let rows = store.list_for_series("s1").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|row| row.canonical_ids.is_some()));

        assert!(store.delete("s1", "en", "s01", "720p").unwrap());
        assert_eq!(store.delete_for_series("s1").unwrap(), 1);
        assert!(store.list_for_series("s1").unwrap().is_empty());
    }

    #[test]
    fn test_find_sparse_matches_only_gapped_rows() {
        let (store, _dir) = setup();
        store.upsert(mapping("720p", 5)).unwrap();
        store
            .upsert(mapping("1080p", 5).with_canonical_ids(vec![100, 101, 103, 104]))
            .unwrap();

        let found = store.find_sparse(-100999, 100, 104).unwrap().unwrap();
        assert_eq!(found.quality_id, "1080p");
        assert!(store.find_sparse(-100999, 100, 103).unwrap().is_none());
        assert!(store.find_sparse(-100123, 100, 104).unwrap().is_none());
    }
}
