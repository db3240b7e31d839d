mod cli;
mod commands;
mod error;
mod logging;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use reelvault_core::BotConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error::handle_error(err);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let _guard = logging::init(cli.log_dir.clone(), cli.verbose)?;
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Run => commands::run::run(config).await,
        Commands::Link { command } => commands::link::run(&config, command, cli.format),
        Commands::Search { query, group } => {
            commands::search::run(&config, &query, group, cli.format).await
        }
        Commands::Series { command } => commands::series::run(&config, command, cli.format).await,
        Commands::Config { command } => {
            commands::config::run(&config, cli.config.as_deref(), command, cli.format)
        }
    }
}

/// Config file, then environment, then explicit flags.
fn load_config(cli: &Cli) -> Result<BotConfig> {
    let mut config = BotConfig::load(cli.config.as_deref())?;
    if let Some(token) = &cli.bot_token {
        config.telegram.bot_token = token.clone();
    }
    if let Some(id) = cli.canonical_channel {
        config.channels.canonical_channel_id = Some(id);
    }
    if let Some(id) = cli.announce_channel {
        config.channels.announcement_channel_id = Some(id);
    }
    if let Some(path) = &cli.db_path {
        config.storage.db_path = Some(path.clone());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "admins = [42]\n\n[telegram]\nbot_token = \"from-file\"\n\n[channels]\ncanonical_channel_id = -100111\n",
        )
        .unwrap();
        let db = dir.path().join("data").join("reelvault.db");

        let cli = Cli::try_parse_from([
            "reelvault",
            "--config",
            path.to_str().unwrap(),
            "--canonical-channel",
            "-100999",
            "--db-path",
            db.to_str().unwrap(),
            "config",
            "show",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();

        assert_eq!(config.admins, vec![42]);
        assert_eq!(config.channels.canonical_channel_id, Some(-100999));
        assert_eq!(config.db_path(), db);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let cli = Cli::try_parse_from([
            "reelvault",
            "--config",
            missing.to_str().unwrap(),
            "config",
            "path",
        ])
        .unwrap();
        assert!(load_config(&cli).is_err());
    }
}
