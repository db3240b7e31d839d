//! The "recently added" channel list, one JSON document per board.

use anyhow::Result;

use crate::{SimpleStorage, define_simple_storage};

define_simple_storage! {
    /// Recent-list documents keyed by board name.
    pub struct RecentListStorage { table: "recent_lists" }
}

impl RecentListStorage {
    pub fn get_raw(&self, board: &str) -> Result<Option<Vec<u8>>> {
        <Self as SimpleStorage>::get_raw(self, board)
    }

    /// Read-modify-write of one board in a single transaction.
    pub fn update_raw<F>(&self, board: &str, apply: F) -> Result<Option<Vec<u8>>>
    where
        F: FnOnce(Option<&[u8]>) -> Result<Option<Vec<u8>>>,
    {
        <Self as SimpleStorage>::update_raw(self, board, apply)
    }
}
