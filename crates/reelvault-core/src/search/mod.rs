//! Free-text title search over published series.

pub mod filter;
pub mod normalize;
pub mod similarity;

use std::collections::HashSet;
use tracing::debug;

use crate::config::SearchConfig;
use crate::models::Series;

pub use filter::is_filler;
pub use normalize::{apply_corrections, normalize};
pub use similarity::sequence_ratio;

const SEQUENCE_WEIGHT: f64 = 0.7;
const WORD_WEIGHT: f64 = 0.3;

/// Where the query was typed. Groups need a stricter match to open a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatScope {
    Private,
    Group,
}

impl ChatScope {
    pub fn threshold(&self, config: &SearchConfig) -> f64 {
        match self {
            ChatScope::Private => config.private_threshold,
            ChatScope::Group => config.group_threshold,
        }
    }
}

/// `0.7 * sequence similarity + 0.3 * shared words / query words`, on
/// normalized text.
pub fn score(query: &str, title: &str) -> f64 {
    let query = normalize(query);
    let title = normalize(title);
    let query_words: HashSet<&str> = query.split_whitespace().collect();
    let title_words: HashSet<&str> = title.split_whitespace().collect();
    let shared = query_words.intersection(&title_words).count();
    let word_ratio = shared as f64 / query_words.len().max(1) as f64;
    SEQUENCE_WEIGHT * sequence_ratio(&query, &title) + WORD_WEIGHT * word_ratio
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome<'a> {
    /// Chatter; stay silent.
    Ignored,
    /// Confident enough to open the series.
    Direct {
        series: &'a Series,
        score: f64,
        /// The query matched only after spelling corrections.
        corrected: bool,
    },
    /// Titles to choose from, best candidate first.
    Results {
        series: Vec<&'a Series>,
        corrected_query: Option<String>,
    },
    NoMatch,
}

/// Resolve a query against `catalog`.
///
/// The best-scoring title opens directly at the scope's threshold. Otherwise
/// titles containing the query are listed, with the best title first when it
/// reaches `candidate_threshold`. A lone listed title opens directly only if
/// it reaches `candidate_threshold` too.
pub fn resolve<'a>(
    query: &str,
    catalog: &'a [Series],
    scope: ChatScope,
    config: &SearchConfig,
) -> SearchOutcome<'a> {
    if is_filler(query) {
        return SearchOutcome::Ignored;
    }
    let normalized = normalize(query);
    if normalized.is_empty() {
        return SearchOutcome::Ignored;
    }
    let corrected = apply_corrections(&normalized);
    let was_corrected = corrected != normalized;

    let mut best: Option<(&Series, f64)> = None;
    for series in catalog {
        let value = score(&corrected, &series.title);
        if best.is_none_or(|(_, top)| value > top) {
            best = Some((series, value));
        }
    }
    let candidate = best.filter(|(_, value)| *value >= config.candidate_threshold);

    if let Some((series, value)) = candidate
        && value >= scope.threshold(config)
    {
        debug!("'{}' matched '{}' ({:.2})", query, series.title, value);
        return SearchOutcome::Direct {
            series,
            score: value,
            corrected: was_corrected,
        };
    }

    let mut matches: Vec<&Series> = catalog
        .iter()
        .filter(|series| {
            let title = normalize(&series.title);
            title.contains(&corrected) || title.contains(&normalized)
        })
        .collect();
    if let Some((series, _)) = candidate {
        matches.retain(|other| other.id != series.id);
        matches.insert(0, series);
    }
    matches.truncate(config.max_results);

    if matches.is_empty() {
        return SearchOutcome::NoMatch;
    }
    if let (1, Some((series, value))) = (matches.len(), candidate)
        && matches[0].id == series.id
    {
        return SearchOutcome::Direct {
            series,
            score: value,
            corrected: was_corrected,
        };
    }
    SearchOutcome::Results {
        series: matches,
        corrected_query: was_corrected.then_some(corrected),
    }
}
