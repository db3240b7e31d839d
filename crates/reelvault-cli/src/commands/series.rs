use anyhow::{Result, bail};
use colored::Colorize;
use comfy_table::{Cell, Table};
use serde_json::json;

use super::{format_timestamp, open_storage};
use crate::cli::SeriesCommands;
use crate::output::{OutputFormat, json::print_json, table::print_table};
use reelvault_core::announce::{content_digest, published_view, should_announce};
use reelvault_core::{BotConfig, Series};

pub async fn run(config: &BotConfig, command: SeriesCommands, format: OutputFormat) -> Result<()> {
    let storage = open_storage(config)?;
    match command {
        SeriesCommands::List { published } => {
            let series = if published {
                storage.catalog.list_published().await?
            } else {
                storage.catalog.list_series().await?
            };
            list_series(&series, format)
        }
        SeriesCommands::Show { id } => match storage.catalog.get_series(&id).await? {
            Some(series) => show_series(&series, format),
            None => bail!("Series not found: {}", id),
        },
        SeriesCommands::Digest { id } => match storage.catalog.get_series(&id).await? {
            Some(series) => show_digest(&series, format),
            None => bail!("Series not found: {}", id),
        },
    }
}

fn list_series(series: &[Series], format: OutputFormat) -> Result<()> {
    if format.is_json() {
        return print_json(&series);
    }
    if series.is_empty() {
        println!("{}", "No series.".dimmed());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Published", "Languages", "Announced", "Created"]);
    for item in series {
        table.add_row(vec![
            Cell::new(&item.id),
            Cell::new(item.display_title()),
            Cell::new(if item.published { "yes" } else { "no" }),
            Cell::new(item.languages.len()),
            Cell::new(
                item.announcement_message_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(format_timestamp(item.created_at)),
        ]);
    }
    print_table(table)
}

fn show_series(series: &Series, format: OutputFormat) -> Result<()> {
    if format.is_json() {
        return print_json(series);
    }

    println!(
        "{} [{}] {}",
        series.display_title().bold(),
        series.id,
        if series.published {
            "published".green()
        } else {
            "draft".yellow()
        }
    );
    for (lang_id, language) in &series.languages {
        println!("  {} [{}]", language.name.bold(), lang_id);
        for (season_id, season) in &language.seasons {
            println!("    {} [{}]", season.name, season_id);
            for (quality_id, quality) in &season.qualities {
                let range = match (quality.first_msg_id, quality.last_msg_id) {
                    (Some(first), Some(last)) => format!("{}..{}", first, last),
                    _ => "no range".to_string(),
                };
                println!(
                    "      batch {} [{}] {} {}",
                    quality.name,
                    quality_id,
                    range,
                    live_label(quality.is_live())
                );
            }
            for (episode_id, episode) in &season.episodes {
                println!("      {} [{}]", episode.name, episode_id);
                for (quality_id, quality) in &episode.qualities {
                    println!(
                        "        {} [{}] {}",
                        quality.name,
                        quality_id,
                        live_label(quality.is_live())
                    );
                }
            }
        }
    }
    Ok(())
}

fn live_label(live: bool) -> colored::ColoredString {
    if live { "live".green() } else { "hidden".dimmed() }
}

fn show_digest(series: &Series, format: OutputFormat) -> Result<()> {
    let digest = content_digest(series);
    let stored = series.content_snapshot.as_deref();
    let due = series.published && should_announce(stored, &digest);

    if format.is_json() {
        return print_json(&json!({
            "id": series.id,
            "digest": digest,
            "stored": stored,
            "announcement_due": due,
            "published_view": published_view(series),
        }));
    }

    println!("{} {}", "Digest:".bold(), digest);
    println!("{} {}", "Stored:".bold(), stored.unwrap_or("-"));
    println!(
        "{} {}",
        "Announcement due:".bold(),
        if due { "yes".green() } else { "no".dimmed() }
    );
    Ok(())
}
