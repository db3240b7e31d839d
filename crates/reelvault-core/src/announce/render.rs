use super::snapshot::{PublishedEpisode, PublishedSeason, published_view};
use crate::html::escape_html;
use crate::models::Series;

const EMPTY_NOTICE: &str = "<i>No content available yet.</i>";

/// Announcement body: title line, then one block per language.
pub fn render_announcement(series: &Series) -> String {
    let mut message = format!("<code>{}</code>", escape_html(&series.display_title()));

    let languages = published_view(series);
    if languages.is_empty() {
        message.push_str("\n\n");
        message.push_str(EMPTY_NOTICE);
        return message;
    }

    for language in &languages {
        message.push_str("\n\n");
        message.push_str(&format!(
            "<b>Language : {}</b>",
            escape_html(&language.name)
        ));
        for season in &language.seasons {
            for line in season_lines(season) {
                message.push('\n');
                message.push_str(&line);
            }
        }
    }
    message
}

fn season_label(season: &PublishedSeason) -> String {
    match season.number {
        Some(number) => format!("S{:02}", number),
        None => escape_html(&season.name),
    }
}

fn season_lines(season: &PublishedSeason) -> Vec<String> {
    let label = season_label(season);
    let mut lines = Vec::new();
    if !season.batch_qualities.is_empty() {
        lines.push(format!("{}: {}", label, join_escaped(&season.batch_qualities)));
    }
    for run in episode_runs(&season.episodes) {
        let span = match run {
            [only] => episode_label(only),
            [first, .., last] => format!("{}-{}", episode_label(first), episode_label(last)),
            [] => continue,
        };
        lines.push(format!("{}{}: {}", label, span, join_escaped(&run[0].qualities)));
    }
    lines
}

fn episode_label(episode: &PublishedEpisode) -> String {
    match episode.number {
        Some(number) => format!("E{:02}", number),
        None => format!(" {}", escape_html(&episode.name)),
    }
}

/// Split sorted episodes into runs of consecutive numbers sharing one quality set.
fn episode_runs(episodes: &[PublishedEpisode]) -> Vec<&[PublishedEpisode]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for index in 1..=episodes.len() {
        let continues = index < episodes.len() && {
            let (prev, next) = (&episodes[index - 1], &episodes[index]);
            matches!((prev.number, next.number), (Some(a), Some(b)) if b == a + 1)
                && prev.qualities == next.qualities
        };
        if !continues {
            runs.push(&episodes[start..index]);
            start = index;
        }
    }
    runs
}

fn join_escaped(names: &[String]) -> String {
    names
        .iter()
        .map(|name| escape_html(name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchQuality, Episode, EpisodeQuality, Language, Season};

    fn live_episode(name: &str, qualities: &[&str]) -> Episode {
        let mut episode = Episode::new(name);
        for (index, quality_name) in qualities.iter().enumerate() {
            let mut quality = EpisodeQuality::new(*quality_name);
            quality.file_link = Some("link".to_string());
            quality.published = true;
            episode.qualities.insert(format!("q{}", index), quality);
        }
        episode
    }

    #[test]
    fn test_empty_series() {
        let series = Series::new("Dark").with_year("2017");
        assert_eq!(
            render_announcement(&series),
            "<code>Dark (2017)</code>\n\n<i>No content available yet.</i>"
        );
    }

    #[test]
    fn test_batch_and_compacted_episode_lines() {
        let mut season1 = Season::new("Season 1");
        for (id, name) in [("a", "720p"), ("b", "1080p")] {
            let mut quality = BatchQuality::new(name);
            quality.share_link = Some("link".to_string());
            quality.published = true;
            season1.qualities.insert(id.to_string(), quality);
        }

        let mut season2 = Season::new("Season 2");
        for number in 1..=5 {
            season2.episodes.insert(
                format!("e{}", number),
                live_episode(&format!("Episode {}", number), &["720p"]),
            );
        }
        season2
            .episodes
            .insert("e7".to_string(), live_episode("Episode 7", &["720p"]));
        season2
            .episodes
            .insert("e8".to_string(), live_episode("Episode 8", &["1080p", "720p"]));

        let mut language = Language::new("English");
        language.seasons.insert("s1".to_string(), season1);
        language.seasons.insert("s2".to_string(), season2);
        let mut series = Series::new("Dark");
        series.languages.insert("en".to_string(), language);

        assert_eq!(
            render_announcement(&series),
            "<code>Dark</code>\n\n\
             <b>Language : English</b>\n\
             S01: 1080p, 720p\n\
             S02E01-E05: 720p\n\
             S02E07: 720p\n\
             S02E08: 1080p, 720p"
        );
    }

    #[test]
    fn test_names_are_escaped() {
        let mut season = Season::new("Specials");
        let mut quality = BatchQuality::new("<HD>");
        quality.share_link = Some("link".to_string());
        quality.published = true;
        season.qualities.insert("q".to_string(), quality);
        let mut language = Language::new("A&B");
        language.seasons.insert("s".to_string(), season);
        let mut series = Series::new("Tom & Jerry");
        series.languages.insert("l".to_string(), language);

        let text = render_announcement(&series);
        assert!(text.starts_with("<code>Tom &amp; Jerry</code>"));
        assert!(text.contains("<b>Language : A&amp;B</b>"));
        assert!(text.contains("Specials: &lt;HD&gt;"));
    }
}
