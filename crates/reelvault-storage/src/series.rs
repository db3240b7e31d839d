//! Series documents - one JSON document per series id.

use anyhow::Result;

use crate::{SimpleStorage, define_simple_storage};

define_simple_storage! {
    /// Byte-level series document storage.
    pub struct SeriesStorage { table: "series" }
}

impl SeriesStorage {
    pub fn put_raw(&self, id: &str, data: &[u8]) -> Result<()> {
        <Self as SimpleStorage>::put_raw(self, id, data)
    }

    pub fn get_raw(&self, id: &str) -> Result<Option<Vec<u8>>> {
        <Self as SimpleStorage>::get_raw(self, id)
    }

    /// Atomically rewrite a document. Missing documents are passed as `None`.
    pub fn update_raw<F>(&self, id: &str, apply: F) -> Result<Option<Vec<u8>>>
    where
        F: FnOnce(Option<&[u8]>) -> Result<Option<Vec<u8>>>,
    {
        <Self as SimpleStorage>::update_raw(self, id, apply)
    }

    pub fn list_raw(&self) -> Result<Vec<(String, Vec<u8>)>> {
        <Self as SimpleStorage>::list_raw(self)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        <Self as SimpleStorage>::delete(self, id)
    }

    pub fn exists(&self, id: &str) -> Result<bool> {
        <Self as SimpleStorage>::exists(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use redb::Database;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn setup() -> (SeriesStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("series.db")).unwrap());
        (SeriesStorage::new(db).unwrap(), temp_dir)
    }

    #[test]
    fn test_update_raw_rewrites_in_place() {
        let (storage, _dir) = setup();
        storage.put_raw("s1", b"one").unwrap();

        let stored = storage
            .update_raw("s1", |current| {
                let mut next = current.unwrap_or_default().to_vec();
                next.extend_from_slice(b"+two");
                Ok(Some(next))
            })
            .unwrap();

        assert_eq!(stored.as_deref(), Some(&b"one+two"[..]));
        assert_eq!(storage.get_raw("s1").unwrap().unwrap(), b"one+two");
    }

    #[test]
    fn test_update_raw_none_keeps_value() {
        let (storage, _dir) = setup();
        storage.put_raw("s1", b"keep").unwrap();

        let stored = storage.update_raw("s1", |_| Ok(None)).unwrap();
        assert_eq!(stored.as_deref(), Some(&b"keep"[..]));

        let missing = storage.update_raw("nope", |_| Ok(None)).unwrap();
        assert!(missing.is_none());
        assert!(!storage.exists("nope").unwrap());
    }

    #[test]
    fn test_update_raw_error_aborts_write() {
        let (storage, _dir) = setup();
        storage.put_raw("s1", b"before").unwrap();

        let result = storage.update_raw("s1", |_| Err(anyhow!("boom")));
        assert!(result.is_err());
        assert_eq!(storage.get_raw("s1").unwrap().unwrap(), b"before");
    }

    #[test]
    fn test_delete() {
        let (storage, _dir) = setup();
        storage.put_raw("s1", b"data").unwrap();

        assert!(storage.delete("s1").unwrap());
        assert!(!storage.delete("s1").unwrap());
        assert!(storage.list_raw().unwrap().is_empty());
    }
}
