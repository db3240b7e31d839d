pub mod config;
pub mod link;
pub mod run;
pub mod search;
pub mod series;

use anyhow::{Context, Result};
use reelvault_core::{BotConfig, Storage};

/// Open the configured database, creating its directory on first use.
pub fn open_storage(config: &BotConfig) -> Result<Storage> {
    let path = config.db_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Storage::open(&path, &config.replication.default_caption_template)
        .with_context(|| format!("Failed to open database {}", path.display()))
}

pub fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
