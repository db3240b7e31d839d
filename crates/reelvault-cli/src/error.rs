use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = format!("{:#}", err).to_lowercase();

    if msg.contains("bot_token") || msg.contains("canonical_channel_id") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Set the missing value in the config file or the environment:");
        eprintln!("  {} reelvault config path", "$".dimmed());
    }

    if msg.contains("series not found") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  List series ids with:");
        eprintln!("  {} reelvault series list", "$".dimmed());
    }

    if msg.contains("database") && msg.contains("lock") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Another reelvault process holds the database. Stop it first.");
    }

    std::process::exit(1);
}
