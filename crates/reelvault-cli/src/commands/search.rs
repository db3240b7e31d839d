use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use super::open_storage;
use crate::output::{OutputFormat, json::print_json};
use reelvault_core::BotConfig;
use reelvault_core::search::{ChatScope, SearchOutcome, resolve, score};

pub async fn run(config: &BotConfig, query: &str, group: bool, format: OutputFormat) -> Result<()> {
    let storage = open_storage(config)?;
    let catalog = storage.catalog.list_published().await?;
    let scope = if group {
        ChatScope::Group
    } else {
        ChatScope::Private
    };

    let outcome = resolve(query, &catalog, scope, &config.search);
    if format.is_json() {
        let value = match &outcome {
            SearchOutcome::Ignored => json!({ "outcome": "ignored" }),
            SearchOutcome::NoMatch => json!({ "outcome": "no_match" }),
            SearchOutcome::Direct {
                series,
                score,
                corrected,
            } => json!({
                "outcome": "direct",
                "id": series.id,
                "title": series.title,
                "score": score,
                "corrected": corrected,
            }),
            SearchOutcome::Results {
                series,
                corrected_query,
            } => json!({
                "outcome": "results",
                "corrected_query": corrected_query,
                "results": series
                    .iter()
                    .map(|s| json!({ "id": s.id, "title": s.title, "score": score(query, &s.title) }))
                    .collect::<Vec<_>>(),
            }),
        };
        return print_json(&value);
    }

    match outcome {
        SearchOutcome::Ignored => println!("{}", "Ignored (conversational filler)".dimmed()),
        SearchOutcome::NoMatch => println!("{}", "No match".yellow()),
        SearchOutcome::Direct {
            series,
            score,
            corrected,
        } => {
            println!(
                "{} {} [{}] score {:.2}{}",
                "Opens".green().bold(),
                series.display_title(),
                series.id,
                score,
                if corrected { " (after corrections)" } else { "" }
            );
        }
        SearchOutcome::Results {
            series,
            corrected_query,
        } => {
            if let Some(corrected) = corrected_query {
                println!("{} {}", "Corrected to:".dimmed(), corrected);
            }
            for (index, item) in series.iter().enumerate() {
                println!(
                    "{:>2}. {} [{}] {:.2}",
                    index + 1,
                    item.display_title(),
                    item.id,
                    score(query, &item.title)
                );
            }
        }
    }
    Ok(())
}
