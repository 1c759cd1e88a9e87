//! Integration tests for the complete FPLGraph pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Entity resolution → Intent selection → Binding
//! - Binding → Graph-augmenting execution → Canonical merge → Projection
//! - Template topology + vector topology → one display graph
//!
//! Run with: cargo test --test integration_tests

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tempfile::tempdir;

use fplgraph_cypher::{classify_local, BoundQuery, Catalog, QueryBinder, RowLimit};
use fplgraph_entities::{
    EntityBag, EntityResolver, Position, Season, StatKey, StaticVocabulary, Vocabulary,
    VocabularySource,
};
use fplgraph_graph::{project, render_html, Canonicalizer, GraphFragment, RawEdge, RawNode};
use fplgraph_retrieval::{GraphAugmentingExecutor, PipelineConfig, RetrievalPipeline};
use fplgraph_store::{GraphStore, Neo4jHttpStore, QueryOutput, ScriptedStore, StoreConfig};

fn vocabulary() -> Vocabulary {
    Vocabulary::new(
        [
            "Arsenal",
            "Liverpool",
            "Manchester City",
            "Tottenham Hotspur",
            "Wolverhampton Wanderers",
        ],
        ["Mohamed Salah", "Harry Kane", "Erling Haaland", "Bukayo Saka"],
    )
}

fn vocabulary_source() -> Arc<dyn VocabularySource> {
    Arc::new(StaticVocabulary::new(vocabulary()))
}

fn row(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object literal")
}

// ============================================================================
// Resolution → binding
// ============================================================================

#[test]
fn test_salah_goals_against_wolves_binds_player_vs_team() {
    let resolver = EntityResolver::new().expect("resolver");
    let text = "How many goals did Salah score against Wolves";
    let bag = resolver.resolve(text, &vocabulary());

    assert_eq!(bag.players, vec!["Mohamed Salah".to_string()]);
    assert_eq!(bag.teams, vec!["Wolverhampton Wanderers".to_string()]);
    assert_eq!(bag.statistics, vec![StatKey::Goals]);

    let intents = classify_local(text, &bag);
    assert!(intents.contains(&"PLAYER_POINTS_VS_SPECIFIC_TEAM"));

    let bound = QueryBinder::bind("PLAYER_POINTS_VS_SPECIFIC_TEAM", &bag, RowLimit::default())
        .expect("player1 and team1 are resolved");
    assert_eq!(
        bound.parameters.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["player1", "team1"]
    );
    assert_eq!(bound.parameters["team1"], "Wolverhampton Wanderers");
}

#[test]
fn test_missing_season_defaults_to_latest_label() {
    let bag = EntityBag {
        players: vec!["Bukayo Saka".to_string()],
        ..Default::default()
    };
    let bound = QueryBinder::bind(
        "PLAYER_GOAL_CONTRIBUTIONS_SPECIFIC_SEASON",
        &bag,
        RowLimit::default(),
    )
    .expect("season is defaulted");
    assert_eq!(bound.parameters["season"], Season::DEFAULT.label());
    assert_eq!(bound.parameters["season"], "2022-23");
}

#[test]
fn test_every_template_binds_with_a_complete_bag() {
    let bag = EntityBag {
        players: vec!["Harry Kane".into(), "Erling Haaland".into()],
        teams: vec!["Arsenal".into(), "Liverpool".into()],
        gameweeks: vec![12],
        positions: vec![Position::Midfielder],
        seasons: vec![Season::S2021_22],
        statistics: vec![StatKey::Assists],
        budget: vec![7.5],
    };
    for template in Catalog::all() {
        let bound = QueryBinder::bind_template(template, &bag, RowLimit::default())
            .unwrap_or_else(|e| panic!("{}: {e}", template.id));
        assert!(!bound.text.contains("$stat_property"), "{}", template.id);
        assert!(!bound.text.contains("$limit"), "{}", template.id);
        assert!(!bound.text.contains("$budget"), "{}", template.id);
        for name in bound.parameters.keys() {
            assert!(bound.text.contains(&format!("${name}")), "{}: {name}", template.id);
        }
    }
}

// ============================================================================
// Execution
// ============================================================================

#[tokio::test]
async fn test_query_without_pattern_yields_rows_and_no_topology() {
    let store = Arc::new(ScriptedStore::new().on(
        "RETURN",
        QueryOutput::from_rows(vec![row(json!({"player": "Harry Kane"}))]),
    ));
    let executor = GraphAugmentingExecutor::new(store.clone());
    let query = BoundQuery {
        template_id: "ADHOC".to_string(),
        text: "RETURN $player1 AS player".to_string(),
        parameters: row(json!({"player1": "Harry Kane"})),
    };

    let out = executor.execute(&query).await.expect("primary query succeeds");
    assert_eq!(out.rows.len(), 1);
    assert!(out.fragment.nodes.is_empty());
    assert!(out.fragment.edges.is_empty());
    assert_eq!(store.calls().len(), 1);
}

#[tokio::test]
async fn test_pipeline_end_to_end_with_scripted_store() {
    let mut topology = GraphFragment::new();
    topology.add_node(
        RawNode::new("4:1", ["Player"])
            .with_property("player_name", "Mohamed Salah")
            .with_property("player_element", 283),
    );
    topology.add_node(RawNode::new("4:2", ["Fixture"]).with_property("fixture_number", 101));
    topology.add_node(RawNode::new("4:3", ["Team"]).with_property("name", "Wolverhampton Wanderers"));
    topology.add_edge(RawEdge::new("5:1", "4:1", "PLAYED_IN", "4:2"));

    let store = Arc::new(
        ScriptedStore::new()
            .on("collect(DISTINCT p) AS p", QueryOutput::default().with_fragment(topology))
            .on(
                "RETURN",
                QueryOutput::from_rows(vec![row(json!({
                    "player": "Mohamed Salah",
                    "opponent": "Wolverhampton Wanderers",
                    "total_points_vs_opponent": 41,
                    "matches_played": 4,
                }))]),
            ),
    );
    let pipeline = RetrievalPipeline::new(
        EntityResolver::new().expect("resolver"),
        vocabulary_source(),
        store.clone(),
        PipelineConfig::default(),
    );

    let outcome = pipeline
        .run("How many goals did Salah score against Wolves", &[])
        .await;

    assert_eq!(outcome.results[0].intent, "PLAYER_POINTS_VS_SPECIFIC_TEAM");
    assert_eq!(outcome.results[0].rows[0]["total_points_vs_opponent"], 41);
    assert!(outcome.graph.node("Player::283").is_some());
    assert!(outcome.graph.node("Team::Wolverhampton Wanderers").is_some());
    for edge in &outcome.graph.edges {
        assert!(outcome.graph.node(&edge.from).is_some());
        assert!(outcome.graph.node(&edge.to).is_some());
    }

    let context = outcome.answer_context();
    assert_eq!(context.len(), outcome.results.len());
    assert_eq!(context[0]["rows"][0]["player"], "Mohamed Salah");

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("graph.html");
    std::fs::write(&path, render_html(&outcome.view, "Salah vs Wolves").expect("render")).expect("write");
    let page = std::fs::read_to_string(&path).expect("read back");
    assert!(page.contains("Mohamed Salah"));
}

#[tokio::test]
async fn test_unreachable_store_degrades_to_no_data() {
    let config = StoreConfig {
        uri: "http://127.0.0.1:9".to_string(),
        password: "secret".to_string(),
        connect_timeout_secs: 1,
        ..Default::default()
    };
    let store: Arc<dyn GraphStore> = Arc::new(Neo4jHttpStore::new(config).expect("client builds"));
    let pipeline = RetrievalPipeline::new(
        EntityResolver::new().expect("resolver"),
        vocabulary_source(),
        store,
        PipelineConfig {
            timeout_secs: Some(5),
            ..Default::default()
        },
    );

    let outcome = pipeline.run("Harry Kane total points", &[]).await;
    assert!(outcome.results.is_empty());
    assert!(!outcome.failed.is_empty());
    assert!(outcome.graph.is_empty());
}

// ============================================================================
// Canonicalization
// ============================================================================

#[test]
fn test_kane_template_and_vector_nodes_merge() {
    let mut template = GraphFragment::new();
    template.add_node(
        RawNode::new("a1", ["Player"])
            .with_property("player_element", 7)
            .with_property("name", "Kane"),
    );

    let mut vector = GraphFragment::new();
    vector.add_node(
        RawNode::new("v9", ["Player"])
            .with_property("player_element", 7)
            .with_property("name", "Kane")
            .with_property("form", "8.2"),
    );
    vector.add_node(RawNode::new("e1", ["Embedding"]).with_property("text", "Harry Kane"));
    vector.add_edge(RawEdge::new("r1", "v9", "HAS_EMBEDDING", "e1"));

    let canonicalizer = Canonicalizer::new();
    let merged = canonicalizer.merge(&template, &vector);

    let players: Vec<_> = merged
        .nodes
        .iter()
        .filter(|n| n.node_type() == Some("Player"))
        .collect();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0].id, "Player::7");
    assert_eq!(players[0].attributes["name"], "Kane");
    assert_eq!(players[0].attributes["form"], "8.2");
    assert_eq!(merged.edges.len(), 1);
    assert_eq!(merged.edges[0].from, "Player::7");
    assert_eq!(merged.edges[0].to, "e1");

    let again = canonicalizer.merge(&template, &merged.to_fragment());
    assert_eq!(again, merged);

    let view = project(&merged);
    assert_eq!(view.nodes.len(), 2);
    assert_eq!(view.edges[0].label, "HAS_EMBEDDING");
}
