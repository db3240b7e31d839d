use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;
use tracing::info;

use super::open_storage;
use reelvault_core::{BotConfig, BotRuntime};

pub async fn run(config: BotConfig) -> Result<()> {
    config.validate()?;
    let storage = open_storage(&config)?;
    let db_path = config.db_path();
    let runtime = Arc::new(BotRuntime::with_telegram(config, storage)?);

    println!(
        "{} ReelVault bot running (database {}). Press Ctrl+C to stop.",
        "▶".green().bold(),
        db_path.display()
    );
    info!("Starting bot, database {}", db_path.display());

    runtime
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    println!("{} Stopped.", "■".yellow());
    Ok(())
}
