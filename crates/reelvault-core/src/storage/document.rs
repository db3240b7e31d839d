//! Document store boundary: series documents with path-scoped updates.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reelvault_storage::SeriesStorage;
use serde_json::Value;

use super::path::FieldPath;

/// Equality filter over document fields. An empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    equals: Vec<(FieldPath, Value)>,
}

impl DocumentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn field_eq(mut self, path: FieldPath, value: Value) -> Self {
        self.equals.push((path, value));
        self
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.equals
            .iter()
            .all(|(path, expected)| path.lookup(document) == Some(expected))
    }
}

/// Result of a guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    MissingDocument,
    /// The guarded node was gone; nothing was written.
    MissingNode,
}

/// Key-value document CRUD keyed by series id.
///
/// `set_fields` and `unset_fields` apply all their paths atomically and return
/// false when the document does not exist.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_document(&self, id: &str, document: Value) -> Result<()>;

    async fn set_fields(&self, id: &str, fields: Vec<(FieldPath, Value)>) -> Result<bool>;

    /// Like `set_fields`, but only when `node` is still an object in the
    /// stored document. The check and the write share one transaction.
    async fn set_fields_within(
        &self,
        id: &str,
        node: &FieldPath,
        fields: Vec<(FieldPath, Value)>,
    ) -> Result<WriteOutcome>;

    async fn unset_fields(&self, id: &str, paths: Vec<FieldPath>) -> Result<bool>;

    async fn get_document(&self, id: &str) -> Result<Option<Value>>;

    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Value>>;

    async fn delete_document(&self, id: &str) -> Result<bool>;
}

/// [`CatalogStore`] backed by the `series` redb table.
#[derive(Debug, Clone)]
pub struct RedbCatalogStore {
    inner: SeriesStorage,
}

impl RedbCatalogStore {
    pub fn new(inner: SeriesStorage) -> Self {
        Self { inner }
    }

    /// Rewrite one document in a single write transaction. The edit is
    /// written back only when it reports `Applied`.
    fn modify<F>(&self, id: &str, edit: F) -> Result<WriteOutcome>
    where
        F: FnOnce(&mut Value) -> Result<WriteOutcome>,
    {
        let mut outcome = WriteOutcome::MissingDocument;
        self.inner.update_raw(id, |current| {
            let Some(bytes) = current else {
                return Ok(None);
            };
            let mut document: Value = serde_json::from_slice(bytes)?;
            outcome = edit(&mut document)?;
            if outcome != WriteOutcome::Applied {
                return Ok(None);
            }
            Ok(Some(serde_json::to_vec(&document)?))
        })?;
        Ok(outcome)
    }
}

#[async_trait]
impl CatalogStore for RedbCatalogStore {
    async fn insert_document(&self, id: &str, document: Value) -> Result<()> {
        if !document.is_object() {
            return Err(anyhow!("Series document {} must be a JSON object", id));
        }
        self.inner.put_raw(id, &serde_json::to_vec(&document)?)
    }

    async fn set_fields(&self, id: &str, fields: Vec<(FieldPath, Value)>) -> Result<bool> {
        let outcome = self.modify(id, |document| {
            for (path, value) in fields {
                path.set(document, value)?;
            }
            Ok(WriteOutcome::Applied)
        })?;
        Ok(outcome == WriteOutcome::Applied)
    }

    async fn set_fields_within(
        &self,
        id: &str,
        node: &FieldPath,
        fields: Vec<(FieldPath, Value)>,
    ) -> Result<WriteOutcome> {
        self.modify(id, |document| {
            if !node.lookup(document).is_some_and(Value::is_object) {
                return Ok(WriteOutcome::MissingNode);
            }
            for (path, value) in fields {
                path.set(document, value)?;
            }
            Ok(WriteOutcome::Applied)
        })
    }

    async fn unset_fields(&self, id: &str, paths: Vec<FieldPath>) -> Result<bool> {
        let outcome = self.modify(id, |document| {
            for path in &paths {
                path.unset(document);
            }
            Ok(WriteOutcome::Applied)
        })?;
        Ok(outcome == WriteOutcome::Applied)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Value>> {
        match self.inner.get_raw(id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Value>> {
        let mut documents = Vec::new();
        for (id, bytes) in self.inner.list_raw()? {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(document) if filter.matches(&document) => documents.push(document),
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable series document {}: {}", id, e),
            }
        }
        Ok(documents)
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        self.inner.delete(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::Database;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn setup() -> (RedbCatalogStore, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("catalog.db")).unwrap());
        let store = RedbCatalogStore::new(SeriesStorage::new(db).unwrap());
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_set_and_unset_fields() {
        let (store, _dir) = setup();
        store
            .insert_document("s1", json!({"id": "s1", "title": "Show"}))
            .await
            .unwrap();

        let updated = store
            .set_fields(
                "s1",
                vec![
                    (FieldPath::language("en").child("name"), json!("English")),
                    (FieldPath::root("published"), json!(true)),
                ],
            )
            .await
            .unwrap();
        assert!(updated);

        let doc = store.get_document("s1").await.unwrap().unwrap();
        assert_eq!(doc["languages"]["en"]["name"], "English");
        assert_eq!(doc["published"], true);

        store
            .unset_fields("s1", vec![FieldPath::language("en")])
            .await
            .unwrap();
        let doc = store.get_document("s1").await.unwrap().unwrap();
        assert_eq!(doc["languages"], json!({}));
    }

    #[tokio::test]
    async fn test_set_fields_on_missing_document() {
        let (store, _dir) = setup();
        let updated = store
            .set_fields("ghost", vec![(FieldPath::root("published"), json!(true))])
            .await
            .unwrap();
        assert!(!updated);
        assert!(store.get_document("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_set_leaves_document_untouched() {
        let (store, _dir) = setup();
        store
            .insert_document("s1", json!({"title": "Show", "languages": 5}))
            .await
            .unwrap();

        let result = store
            .set_fields(
                "s1",
                vec![
                    (FieldPath::root("title"), json!("Changed")),
                    (FieldPath::language("en"), json!({})),
                ],
            )
            .await;
        assert!(result.is_err());

        let doc = store.get_document("s1").await.unwrap().unwrap();
        assert_eq!(doc["title"], "Show");
    }

    #[tokio::test]
    async fn test_set_fields_within_missing_node_writes_nothing() {
        let (store, _dir) = setup();
        let original = json!({"title": "Show", "languages": {"en": {"name": "English"}}});
        store.insert_document("s1", original.clone()).await.unwrap();

        let gone = FieldPath::language("hi");
        let outcome = store
            .set_fields_within(
                "s1",
                &gone,
                vec![
                    (gone.clone().child("published"), json!(true)),
                    (FieldPath::root("updated_at"), json!(5)),
                ],
            )
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::MissingNode);
        assert_eq!(store.get_document("s1").await.unwrap().unwrap(), original);

        let present = FieldPath::language("en");
        let outcome = store
            .set_fields_within(
                "s1",
                &present,
                vec![(present.clone().child("published"), json!(true))],
            )
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Applied);
        let doc = store.get_document("s1").await.unwrap().unwrap();
        assert_eq!(doc["languages"]["en"]["published"], true);

        let outcome = store
            .set_fields_within("ghost", &present, Vec::new())
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::MissingDocument);
    }

    #[tokio::test]
    async fn test_list_documents_with_filter() {
        let (store, _dir) = setup();
        store
            .insert_document("a", json!({"title": "A", "published": true}))
            .await
            .unwrap();
        store
            .insert_document("b", json!({"title": "B", "published": false}))
            .await
            .unwrap();

        let all = store.list_documents(&DocumentFilter::all()).await.unwrap();
        assert_eq!(all.len(), 2);

        let published = store
            .list_documents(
                &DocumentFilter::all().field_eq(FieldPath::root("published"), json!(true)),
            )
            .await
            .unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0]["title"], "A");
    }
}
