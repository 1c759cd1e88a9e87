//! Property-based tests for entity extraction
//!
//! 1. No category ever holds duplicates
//! 2. Extraction is deterministic
//! 3. Fuzzy scores stay within 0..=100 and are symmetric where expected

use fplgraph_entities::fuzz;
use fplgraph_entities::{EntityBag, EntityResolver, Vocabulary};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn vocabulary() -> Vocabulary {
    Vocabulary::new(
        ["Arsenal", "Chelsea", "Liverpool", "Manchester City", "Wolverhampton Wanderers"],
        ["Mohamed Salah", "Harry Kane", "Erling Haaland", "Bukayo Saka", "Kevin De Bruyne"],
    )
}

/// Fragments that exercise every extractor.
fn fragment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("gw 5".to_string()),
        Just("gameweek 12".to_string()),
        Just("Salah".to_string()),
        Just("Harry Kane".to_string()),
        Just("Wolves".to_string()),
        Just("man city".to_string()),
        Just("Arsenal".to_string()),
        Just("defenders".to_string()),
        Just("keeper".to_string()),
        Just("2021-22".to_string()),
        Just("22/23".to_string()),
        Just("clean sheets".to_string()),
        Just("cs".to_string()),
        Just("assists".to_string()),
        Just("under 7.5".to_string()),
        "[a-z]{1,8}".prop_map(|s| s),
    ]
}

fn utterance_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(fragment_strategy(), 0..8).prop_map(|parts| parts.join(" "))
}

fn has_duplicates<T: PartialEq>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, a)| items[i + 1..].iter().any(|b| a == b))
}

fn assert_no_duplicates(bag: &EntityBag) -> Result<(), TestCaseError> {
    prop_assert!(!has_duplicates(&bag.players));
    prop_assert!(!has_duplicates(&bag.teams));
    prop_assert!(!has_duplicates(&bag.gameweeks));
    prop_assert!(!has_duplicates(&bag.positions));
    prop_assert!(!has_duplicates(&bag.seasons));
    prop_assert!(!has_duplicates(&bag.statistics));
    prop_assert!(!has_duplicates(&bag.budget));
    Ok(())
}

// ============================================================================
// Extraction invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn categories_never_contain_duplicates(text in utterance_strategy()) {
        let resolver = EntityResolver::new().unwrap();
        let bag = resolver.resolve(&text, &vocabulary());
        assert_no_duplicates(&bag)?;
    }

    #[test]
    fn repeated_fragments_do_not_duplicate(fragment in fragment_strategy(), n in 1usize..5) {
        let resolver = EntityResolver::new().unwrap();
        let text = vec![fragment; n].join(" and ");
        let bag = resolver.resolve(&text, &vocabulary());
        assert_no_duplicates(&bag)?;
    }

    #[test]
    fn extraction_is_deterministic(text in utterance_strategy()) {
        let resolver = EntityResolver::new().unwrap();
        let vocab = vocabulary();
        let first = resolver.resolve(&text, &vocab);
        let second = resolver.resolve(&text, &vocab);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn budget_is_never_empty(text in utterance_strategy()) {
        let resolver = EntityResolver::new().unwrap();
        prop_assert!(!resolver.extract_budget(&text).is_empty());
    }
}

// ============================================================================
// Scorer invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn scores_are_bounded(a in "[a-zA-Z ]{0,20}", b in "[a-zA-Z ]{0,20}") {
        prop_assert!(fuzz::ratio(&a, &b) <= 100);
        prop_assert!(fuzz::token_sort_ratio(&a, &b) <= 100);
        prop_assert!(fuzz::token_set_ratio(&a, &b) <= 100);
        prop_assert!(fuzz::partial_ratio(&a, &b) <= 100);
    }

    #[test]
    fn token_scores_are_symmetric(a in "[a-z ]{0,20}", b in "[a-z ]{0,20}") {
        prop_assert_eq!(fuzz::token_sort_ratio(&a, &b), fuzz::token_sort_ratio(&b, &a));
        prop_assert_eq!(fuzz::token_set_ratio(&a, &b), fuzz::token_set_ratio(&b, &a));
    }

    #[test]
    fn identical_words_score_full(word in "[a-z]{1,12}") {
        prop_assert_eq!(fuzz::ratio(&word, &word), 100);
        prop_assert_eq!(fuzz::token_set_ratio(&word, &format!("x {word} y")), 100);
    }
}
