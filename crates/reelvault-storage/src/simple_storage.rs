use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::sync::Arc;

use crate::keys::prefix_bounds;

/// Single-table key-value store over `redb`.
///
/// Implementors name their table and hand out the shared database; every
/// CRUD operation comes for free.
pub trait SimpleStorage: Send + Sync {
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]>;

    fn db(&self) -> &Arc<Database>;

    fn put_raw(&self, id: &str, data: &[u8]) -> Result<()> {
        let write_txn = self.db().begin_write()?;
        {
            let mut table = write_txn.open_table(Self::TABLE)?;
            table.insert(id, data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_raw(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(Self::TABLE)?;
        Ok(table.get(id)?.map(|value| value.value().to_vec()))
    }

    /// Read-modify-write of one entry inside a single write transaction.
    ///
    /// `apply` sees the current bytes (if any). Returning `Some` stores the new
    /// bytes; returning `None` leaves the entry untouched. The stored value is
    /// returned.
    fn update_raw<F>(&self, id: &str, apply: F) -> Result<Option<Vec<u8>>>
    where
        F: FnOnce(Option<&[u8]>) -> Result<Option<Vec<u8>>>,
    {
        let write_txn = self.db().begin_write()?;
        let stored = {
            let mut table = write_txn.open_table(Self::TABLE)?;
            let current = table.get(id)?.map(|value| value.value().to_vec());
            match apply(current.as_deref())? {
                Some(next) => {
                    table.insert(id, next.as_slice())?;
                    Some(next)
                }
                None => current,
            }
        };
        write_txn.commit()?;
        Ok(stored)
    }

    fn list_raw(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(Self::TABLE)?;

        let mut items = Vec::new();
        for item in table.iter()? {
            let (key, value) = item?;
            items.push((key.value().to_string(), value.value().to_vec()));
        }
        Ok(items)
    }

    /// Entries whose key starts with `prefix`, in key order.
    fn list_prefix_raw(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        if prefix.is_empty() {
            return self.list_raw();
        }
        let (start, end) = prefix_bounds(prefix);
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(Self::TABLE)?;

        let mut items = Vec::new();
        for item in table.range(start.as_str()..end.as_str())? {
            let (key, value) = item?;
            items.push((key.value().to_string(), value.value().to_vec()));
        }
        Ok(items)
    }

    /// Delete by ID, returns true if existed.
    fn delete(&self, id: &str) -> Result<bool> {
        let write_txn = self.db().begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(Self::TABLE)?;
            table.remove(id)?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    /// Delete every entry under `prefix`, returning how many were removed.
    fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let keys: Vec<String> = self
            .list_prefix_raw(prefix)?
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        if keys.is_empty() {
            return Ok(0);
        }

        let write_txn = self.db().begin_write()?;
        {
            let mut table = write_txn.open_table(Self::TABLE)?;
            for key in &keys {
                table.remove(key.as_str())?;
            }
        }
        write_txn.commit()?;
        tracing::debug!(prefix, removed = keys.len(), "Deleted entries by prefix");
        Ok(keys.len())
    }

    fn exists(&self, id: &str) -> Result<bool> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(Self::TABLE)?;
        Ok(table.get(id)?.is_some())
    }

    fn count(&self) -> Result<usize> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(Self::TABLE)?;
        Ok(table.len()? as usize)
    }
}

/// Generates a store struct bound to one named table.
#[macro_export]
macro_rules! define_simple_storage {
    ( $(#[$meta:meta])* $vis:vis struct $name:ident { table: $table_name:literal } ) => {
        const TABLE: redb::TableDefinition<'static, &'static str, &'static [u8]> =
            redb::TableDefinition::new($table_name);

        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            db: std::sync::Arc<redb::Database>,
        }

        impl $name {
            pub fn new(db: std::sync::Arc<redb::Database>) -> anyhow::Result<Self> {
                let write_txn = db.begin_write()?;
                write_txn.open_table(TABLE)?;
                write_txn.commit()?;

                Ok(Self { db })
            }
        }

        impl $crate::SimpleStorage for $name {
            const TABLE: redb::TableDefinition<'static, &'static str, &'static [u8]> = TABLE;

            fn db(&self) -> &std::sync::Arc<redb::Database> {
                &self.db
            }
        }
    };
}
