//! Text views of a series: the admin's editing tree and the public listing.

use crate::dispatch::action::{ActionKind, CallbackAction};
use crate::html::escape_html;
use crate::models::{CatalogCoordinates, Series};

fn actions(at: &CatalogCoordinates, kinds: &[ActionKind]) -> String {
    kinds
        .iter()
        .map(|kind| format!("<code>{}</code>", CallbackAction::new(*kind, at.clone())))
        .collect::<Vec<_>>()
        .join(" ")
}

fn state(live: bool, has_content: bool) -> &'static str {
    match (live, has_content) {
        (true, _) => "live",
        (false, true) => "hidden",
        (false, false) => "empty",
    }
}

/// The catalog tree with the action payloads of every node, for `/do`.
pub fn admin_tree(series: &Series) -> String {
    let root = CatalogCoordinates::series(&series.id);
    let mut text = format!(
        "<b>{}</b> [{}] {}\n{}",
        escape_html(&series.display_title()),
        series.id,
        if series.published { "published" } else { "draft" },
        actions(
            &root,
            &[
                ActionKind::AddLanguage,
                ActionKind::UpdatePoster,
                ActionKind::EditDetails,
                ActionKind::TogglePublish,
                ActionKind::DeleteSeries,
            ],
        )
    );

    for (lang_id, language) in &series.languages {
        let at = root.clone().with_lang(lang_id);
        text.push_str(&format!(
            "\n\n<b>{}</b> {}",
            escape_html(&language.name),
            actions(&at, &[ActionKind::AddSeason, ActionKind::DeleteLanguage])
        ));
        for (season_id, season) in &language.seasons {
            let at = at.clone().with_season(season_id);
            text.push_str(&format!(
                "\n  {} {}",
                escape_html(&season.name),
                actions(
                    &at,
                    &[
                        ActionKind::AddQuality,
                        ActionKind::AddEpisode,
                        ActionKind::ClearEpisodes,
                        ActionKind::DeleteSeason,
                    ],
                )
            ));
            for (quality_id, quality) in &season.qualities {
                let at = at.clone().with_quality(quality_id);
                text.push_str(&format!(
                    "\n    batch {} ({}) {}",
                    escape_html(&quality.name),
                    state(quality.is_live(), quality.share_link.is_some()),
                    actions(
                        &at,
                        &[
                            ActionKind::BeginBatch,
                            ActionKind::PublishQuality,
                            ActionKind::DeleteQuality,
                        ],
                    )
                ));
            }
            for (episode_id, episode) in &season.episodes {
                let at = at.clone().with_episode(episode_id);
                text.push_str(&format!(
                    "\n    {} {}",
                    escape_html(&episode.name),
                    actions(
                        &at,
                        &[ActionKind::AddEpisodeQuality, ActionKind::DeleteEpisode],
                    )
                ));
                for (quality_id, quality) in &episode.qualities {
                    let at = at.clone().with_quality(quality_id);
                    text.push_str(&format!(
                        "\n      {} ({}) {}",
                        escape_html(&quality.name),
                        state(quality.is_live(), quality.file_link.is_some()),
                        actions(
                            &at,
                            &[
                                ActionKind::BeginEpisodeFile,
                                ActionKind::DeleteEpisodeQuality,
                            ],
                        )
                    ));
                }
            }
        }
    }
    text
}

/// What an end user sees when opening a series: live content with links.
pub fn public_view(series: &Series) -> String {
    let mut text = format!("<b>{}</b>", escape_html(&series.display_title()));
    let facts: Vec<String> = [("Genre", &series.genre), ("Rating", &series.rating)]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_ref()
                .map(|value| format!("{}: {}", label, escape_html(value)))
        })
        .collect();
    if !facts.is_empty() {
        text.push('\n');
        text.push_str(&facts.join(" | "));
    }

    let mut any = false;
    for language in series.languages.values() {
        let mut lines = Vec::new();
        for season in language.seasons.values() {
            for quality in season.qualities.values().filter(|q| q.is_live()) {
                lines.push(format!(
                    "{} {}: <a href=\"{}\">Get</a>",
                    escape_html(&season.name),
                    escape_html(&quality.name),
                    quality.share_link.as_deref().unwrap_or_default()
                ));
            }
            for episode in season.episodes.values() {
                for quality in episode.qualities.values().filter(|q| q.is_live()) {
                    lines.push(format!(
                        "{} {} {}: <a href=\"{}\">Get</a>",
                        escape_html(&season.name),
                        escape_html(&episode.name),
                        escape_html(&quality.name),
                        quality.file_link.as_deref().unwrap_or_default()
                    ));
                }
            }
        }
        if lines.is_empty() {
            continue;
        }
        any = true;
        text.push_str(&format!(
            "\n\n<b>Language : {}</b>\n{}",
            escape_html(&language.name),
            lines.join("\n")
        ));
    }
    if !any {
        text.push_str("\n\n<i>No content available yet.</i>");
    }
    text
}
