//! Per-admin caption templates, keyed by the admin's user id.

use anyhow::Result;

use crate::{SimpleStorage, define_simple_storage};

define_simple_storage! {
    /// Caption template text stored as UTF-8 bytes.
    pub struct CaptionTemplateStorage { table: "caption_templates" }
}

impl CaptionTemplateStorage {
    pub fn set(&self, user_id: i64, template: &str) -> Result<()> {
        self.put_raw(&user_id.to_string(), template.as_bytes())
    }

    pub fn get(&self, user_id: i64) -> Result<Option<String>> {
        match self.get_raw(&user_id.to_string())? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes)?)),
            None => Ok(None),
        }
    }

    /// Returns true if a template was removed.
    pub fn remove(&self, user_id: i64) -> Result<bool> {
        self.delete(&user_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::Database;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_set_get_remove() {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("captions.db")).unwrap());
        let storage = CaptionTemplateStorage::new(db).unwrap();

        assert!(storage.get(42).unwrap().is_none());

        storage.set(42, "{filename} | {quality}").unwrap();
        assert_eq!(
            storage.get(42).unwrap().as_deref(),
            Some("{filename} | {quality}")
        );

        storage.set(42, "{filename}").unwrap();
        assert_eq!(storage.get(42).unwrap().as_deref(), Some("{filename}"));

        assert!(storage.remove(42).unwrap());
        assert!(!storage.remove(42).unwrap());
        assert!(storage.get(42).unwrap().is_none());
    }
}
