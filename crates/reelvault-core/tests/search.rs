use reelvault_core::Series;
use reelvault_core::config::SearchConfig;
use reelvault_core::search::{ChatScope, SearchOutcome, is_filler, resolve, score};

fn catalog() -> Vec<Series> {
    ["Stranger Things", "Dark", "The Office", "Money Heist", "Breaking Bad"]
        .into_iter()
        .map(Series::new)
        .collect()
}

#[test]
fn test_exact_title_navigates_in_both_scopes() {
    let catalog = catalog();
    let config = SearchConfig::default();
    assert!(score("stranger things", "Stranger Things") >= 0.85);
    for scope in [ChatScope::Private, ChatScope::Group] {
        match resolve("Stranger Things!", &catalog, scope, &config) {
            SearchOutcome::Direct { series, .. } => assert_eq!(series.title, "Stranger Things"),
            other => panic!("expected a direct match, got {:?}", other),
        }
    }
}

#[test]
fn test_chatter_never_reaches_scoring() {
    let catalog = catalog();
    let config = SearchConfig::default();
    for query in ["hi", "ok", "thanks", "  ", "?", "hey"] {
        assert!(is_filler(query), "{:?}", query);
        assert_eq!(
            resolve(query, &catalog, ChatScope::Private, &config),
            SearchOutcome::Ignored
        );
    }
}

#[test]
fn test_unrelated_query_is_never_auto_selected() {
    let catalog = catalog();
    let config = SearchConfig::default();
    for query in ["zebra crossing", "quantum", "qwerty uiop"] {
        assert!(!matches!(
            resolve(query, &catalog, ChatScope::Private, &config),
            SearchOutcome::Direct { .. }
        ));
    }
}

#[test]
fn test_partial_title_lists_candidates() {
    let catalog = catalog();
    let outcome = resolve("bad", &catalog, ChatScope::Group, &SearchConfig::default());
    match outcome {
        SearchOutcome::Results { series, .. } => {
            assert_eq!(series.len(), 1);
            assert_eq!(series[0].title, "Breaking Bad");
        }
        other => panic!("expected results, got {:?}", other),
    }
}
