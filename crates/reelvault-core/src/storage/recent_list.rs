//! Typed access to the recently-added list.

use anyhow::Result;
use reelvault_storage::RecentListStorage;

use crate::models::RecentList;

const BOARD: &str = "main";

#[derive(Debug, Clone)]
pub struct RecentListStore {
    inner: RecentListStorage,
}

impl RecentListStore {
    pub fn new(inner: RecentListStorage) -> Self {
        Self { inner }
    }

    /// The stored list, or an empty one.
    pub fn load(&self) -> Result<RecentList> {
        match self.inner.get_raw(BOARD)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(RecentList::default()),
        }
    }

    /// Apply `edit` to the list in one write transaction and return the result.
    pub fn update(&self, edit: impl FnOnce(&mut RecentList)) -> Result<RecentList> {
        let stored = self.inner.update_raw(BOARD, |current| {
            let mut list = match current {
                Some(bytes) => serde_json::from_slice(bytes)?,
                None => RecentList::default(),
            };
            edit(&mut list);
            Ok(Some(serde_json::to_vec(&list)?))
        })?;
        match stored {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(RecentList::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::tests::test_storage;

    #[test]
    fn test_update_persists_channel_and_entries() {
        let (storage, _dir) = test_storage();
        let store = &storage.recent_lists;
        assert_eq!(store.load().unwrap().channel_id, None);

        store
            .update(|list| {
                list.channel_id = Some(-100777);
                list.upsert("s1", "Dark", "S01");
            })
            .unwrap();
        let list = store.update(|list| list.message_id = Some(12)).unwrap();
        assert_eq!(list.channel_id, Some(-100777));
        assert_eq!(list.message_id, Some(12));
        assert_eq!(store.load().unwrap().entries[0].title, "Dark");
    }
}
