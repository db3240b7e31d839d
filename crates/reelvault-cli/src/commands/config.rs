use anyhow::Result;
use std::path::Path;

use crate::cli::ConfigCommands;
use crate::output::{OutputFormat, json::print_json};
use reelvault_core::BotConfig;

const REDACTED: &str = "********";

pub fn run(
    config: &BotConfig,
    path: Option<&Path>,
    command: ConfigCommands,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let mut shown = config.clone();
            if !shown.telegram.bot_token.is_empty() {
                shown.telegram.bot_token = REDACTED.to_string();
            }
            if format.is_json() {
                return print_json(&shown);
            }
            print!("{}", shown.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            let path = path
                .map(Path::to_path_buf)
                .unwrap_or_else(BotConfig::default_path);
            println!("{}", path.display());
            Ok(())
        }
    }
}
