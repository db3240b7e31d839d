use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use crate::cli::LinkCommands;
use crate::output::{OutputFormat, json::print_json};
use reelvault_core::BotConfig;
use reelvault_core::link::{DeepLinks, RangeAddress, StartPayload};

pub fn run(config: &BotConfig, command: LinkCommands, format: OutputFormat) -> Result<()> {
    match command {
        LinkCommands::Encode {
            channel_id,
            first_id,
            last_id,
        } => encode(
            config,
            RangeAddress::checked(channel_id, first_id, last_id)?,
            format,
        ),
        LinkCommands::Decode { link } => decode(&link, format),
    }
}

fn encode(config: &BotConfig, address: RangeAddress, format: OutputFormat) -> Result<()> {
    let token = address.encode();
    let link = config
        .telegram
        .bot_username
        .as_deref()
        .map(|username| DeepLinks::new(username).range(&address));

    if format.is_json() {
        return print_json(&json!({ "token": token, "link": link, "count": address.len() }));
    }

    println!("{} {}", "Token:".bold(), token);
    match link {
        Some(link) => println!("{} {}", "Link:".bold(), link),
        None => println!("{}", "Set telegram.bot_username to build the full link.".dimmed()),
    }
    Ok(())
}

fn decode(link: &str, format: OutputFormat) -> Result<()> {
    match StartPayload::parse(link)? {
        StartPayload::Range(address) => {
            if format.is_json() {
                return print_json(&json!({
                    "channel_id": address.channel_id,
                    "first_id": address.first_id,
                    "last_id": address.last_id,
                    "count": address.len(),
                    "descending": address.is_descending(),
                }));
            }
            println!("{} {}", "Channel:".bold(), address.channel_id);
            println!(
                "{} {} → {} ({} message(s){})",
                "Range:".bold(),
                address.first_id,
                address.last_id,
                address.len(),
                if address.is_descending() {
                    ", descending"
                } else {
                    ""
                }
            );
        }
        StartPayload::Series(id) => println!("{} {}", "Series:".bold(), id),
        StartPayload::Greeting => println!("{}", "Plain /start (no payload)".dimmed()),
    }
    Ok(())
}
