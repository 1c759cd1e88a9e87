//! Property-based tests over the template catalog
//!
//! 1. Binding yields a complete parameter set or names every missing one
//! 2. Bound text never carries a structural token
//! 3. Every bound template has an extraction query that returns its variables
//! 4. The analyzer never panics on arbitrary input

use fplgraph_cypher::{extraction_query, pattern_variables, BindingError, Catalog, QueryBinder, RowLimit};
use fplgraph_entities::{EntityBag, Position, Season, StatKey};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn bag_strategy() -> impl Strategy<Value = EntityBag> {
    (
        prop::collection::vec(prop_oneof![Just("Mohamed Salah"), Just("Harry Kane"), Just("Bukayo Saka")], 0..3),
        prop::collection::vec(prop_oneof![Just("Arsenal"), Just("Chelsea")], 0..2),
        prop::collection::vec(1u32..39, 0..2),
        prop::option::of(prop::sample::select(Position::ALL.to_vec())),
        prop::option::of(prop::sample::select(Season::ALL.to_vec())),
        prop::option::of(prop::sample::select(StatKey::ALL.to_vec())),
    )
        .prop_map(|(players, teams, gameweeks, position, season, stat)| {
            let mut players: Vec<String> = players.into_iter().map(String::from).collect();
            players.dedup();
            let mut teams: Vec<String> = teams.into_iter().map(String::from).collect();
            teams.dedup();
            let mut gameweeks = gameweeks;
            gameweeks.dedup();
            EntityBag {
                players,
                teams,
                gameweeks,
                positions: position.into_iter().collect(),
                seasons: season.into_iter().collect(),
                statistics: stat.into_iter().collect(),
                budget: vec![6.0],
            }
        })
}

fn template_id_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(Catalog::ids().collect::<Vec<_>>())
}

fn full_bag() -> EntityBag {
    EntityBag {
        players: vec!["Mohamed Salah".into(), "Harry Kane".into()],
        teams: vec!["Arsenal".into(), "Chelsea".into()],
        gameweeks: vec![3],
        positions: vec![Position::Forward],
        seasons: vec![Season::S2021_22],
        statistics: vec![StatKey::Assists],
        budget: vec![7.5],
    }
}

// ============================================================================
// Binding
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(400))]

    #[test]
    fn binding_is_complete_or_names_missing(id in template_id_strategy(), bag in bag_strategy(), limit in 1u32..=100) {
        let template = Catalog::get(id).unwrap();
        match QueryBinder::bind(id, &bag, RowLimit::new(limit).unwrap()) {
            Ok(q) => {
                for p in template.required.iter().filter(|p| !p.is_structural()) {
                    prop_assert!(q.parameters.contains_key(p.name()), "{id} lacks {p}");
                }
                for structural in ["$stat_property", "$limit", "$budget"] {
                    prop_assert!(!q.text.contains(structural), "{id} kept {structural}");
                }
                for key in q.parameters.keys() {
                    let needle = format!("${key}");
                    prop_assert!(q.text.contains(&needle));
                }
            }
            Err(BindingError::Missing { missing, template_id, .. }) => {
                prop_assert_eq!(template_id, id);
                prop_assert!(!missing.is_empty());
                for p in &missing {
                    prop_assert!(template.requires(*p));
                }
            }
            Err(other) => prop_assert!(false, "unexpected {other}"),
        }
    }

    #[test]
    fn analyzer_never_panics(query in "\\PC{0,80}") {
        let _ = pattern_variables(&query);
        let _ = extraction_query(&query);
    }
}

// ============================================================================
// Extraction over the whole library
// ============================================================================

#[test]
fn every_template_has_an_extraction_query() {
    let bag = full_bag();
    for template in Catalog::all() {
        let bound = QueryBinder::bind(template.id, &bag, RowLimit::DEFAULT).unwrap();
        let variables = pattern_variables(&bound.text);
        let extraction = extraction_query(&bound.text)
            .unwrap_or_else(|| panic!("{} has no extraction query", template.id));
        assert_eq!(extraction.variables, variables, "{}", template.id);

        let tail = extraction.text.rsplit("RETURN").next().unwrap();
        for v in &variables {
            let carried = tail.contains(&format!(", {v}")) || tail.contains(&format!(" AS {v}"));
            assert!(carried, "{}: {v} not returned in\n{}", template.id, extraction.text);
        }
        assert!(!extraction.text.contains("//"));
    }
}

#[test]
fn extraction_of_extraction_is_stable_on_plain_returns() {
    let bag = full_bag();
    let bound = QueryBinder::bind("PLAYER_LAST_N_FIXTURES_PERFORMANCE", &bag, RowLimit::DEFAULT).unwrap();
    let once = extraction_query(&bound.text).unwrap();
    let twice = extraction_query(&once.text).unwrap();
    assert_eq!(once.text, twice.text);
}
