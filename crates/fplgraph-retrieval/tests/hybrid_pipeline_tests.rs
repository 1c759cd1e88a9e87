//! Hybrid retrieval against a scripted store.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use fplgraph_entities::{EntityResolver, StaticVocabulary, Vocabulary, VocabularySource};
use fplgraph_graph::{GraphFragment, RawEdge, RawNode};
use fplgraph_retrieval::{
    EmbeddingFile, EmbeddingItem, FlatVectorIndex, GraphAugmentingExecutor, IntentResult,
    PipelineConfig, RetrievalMode, RetrievalPipeline, TokenHashEmbedder, VectorRetriever,
};
use fplgraph_store::{QueryOutput, ScriptedStore};

fn vocabulary() -> Arc<dyn VocabularySource> {
    Arc::new(StaticVocabulary::new(Vocabulary::new(
        ["Tottenham Hotspur", "Manchester City"],
        ["Harry Kane", "Erling Haaland"],
    )))
}

fn row(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn template_topology() -> QueryOutput {
    let mut fragment = GraphFragment::new();
    fragment.add_node(
        RawNode::new("1", ["Player"])
            .with_property("player_name", "Harry Kane")
            .with_property("player_element", 7),
    );
    QueryOutput::default().with_fragment(fragment)
}

fn vector_topology() -> QueryOutput {
    let mut fragment = GraphFragment::new();
    fragment.add_node(RawNode::new("900", ["Embedding"]).with_property("text", "Players: Harry Kane"));
    fragment.add_node(
        RawNode::new("55", ["Player"])
            .with_property("player_name", "Harry Kane")
            .with_property("player_element", 7)
            .with_property("form", "8.2"),
    );
    fragment.add_edge(RawEdge::new("901", "55", "HAS_EMBEDDING", "900"));
    QueryOutput::default().with_fragment(fragment)
}

fn hybrid_pipeline(store: Arc<ScriptedStore>) -> RetrievalPipeline {
    let embedder = TokenHashEmbedder::default();
    let index = FlatVectorIndex::new(EmbeddingFile {
        model: Some(fplgraph_retrieval::Embedder::model(&embedder).to_string()),
        dim: embedder.dim(),
        items: vec![
            EmbeddingItem {
                embedding_id: 900,
                vector: embedder.embed_text("Players: Harry Kane"),
            },
            EmbeddingItem {
                embedding_id: 901,
                vector: embedder.embed_text("Players: Erling Haaland"),
            },
        ],
    })
    .unwrap();
    let config = PipelineConfig {
        mode: RetrievalMode::Hybrid,
        top_k: 1,
        ..Default::default()
    };
    let retriever = VectorRetriever::new(
        Arc::new(embedder),
        Arc::new(index),
        GraphAugmentingExecutor::new(store.clone()),
    );
    RetrievalPipeline::new(EntityResolver::new().unwrap(), vocabulary(), store, config)
        .with_vector(retriever)
}

#[tokio::test]
async fn hybrid_merges_vector_topology_into_template_graph() {
    let store = Arc::new(
        ScriptedStore::new()
            .on("collect(DISTINCT e)", vector_topology())
            .on("HAS_EMBEDDING", QueryOutput::from_rows(vec![row(json!({"embedding_id": 900}))]))
            .on("collect(DISTINCT p)", template_topology())
            .on("RETURN", QueryOutput::from_rows(vec![row(json!({"total_points": 263}))])),
    );
    let outcome = hybrid_pipeline(store)
        .run("Harry Kane career", &["PLAYER_CAREER_STATS_TOTALS".to_string()])
        .await;

    assert_eq!(outcome.results.len(), 1);
    let vector = outcome.vector.as_ref().unwrap();
    assert_eq!(vector.hits[0].embedding_node_id, 900);
    assert_eq!(vector.sources.len(), 1);

    let kane = outcome.graph.node("Player::7").unwrap();
    assert_eq!(kane.attributes["player_name"], "Harry Kane");
    assert_eq!(kane.attributes["form"], "8.2");
    assert_eq!(
        outcome.graph.nodes.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(),
        vec!["Player::7", "900"]
    );
    assert_eq!(outcome.graph.edges.len(), 1);
    assert_eq!(outcome.graph.edges[0].from, "Player::7");
    assert_eq!(outcome.graph.edges[0].to, "900");
}

#[tokio::test]
async fn vector_failure_keeps_template_results() {
    let store = Arc::new(
        ScriptedStore::new()
            .fail_on("UNWIND $embedding_ids", "vector side down")
            .on("RETURN", QueryOutput::from_rows(vec![row(json!({"total_points": 263}))])),
    );
    let outcome = hybrid_pipeline(store)
        .run("Harry Kane career", &["PLAYER_CAREER_STATS_TOTALS".to_string()])
        .await;
    assert!(outcome.vector.is_none());
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].rows[0]["total_points"], 263);
}

// ============================================================================
// Answer context
// ============================================================================

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-z ]{0,12}".prop_map(Value::from),
    ]
}

fn any_value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn answer_context_is_flat(rows in prop::collection::vec(
        prop::collection::btree_map("[a-z]{1,6}", any_value(), 0..5), 0..4)
    ) {
        let result = IntentResult {
            intent: "X".to_string(),
            rows: rows.into_iter().map(|r| r.into_iter().collect()).collect(),
            ..Default::default()
        };
        let ctx = result.answer_context();
        for row in ctx["rows"].as_array().unwrap() {
            for value in row.as_object().unwrap().values() {
                prop_assert!(!value.is_object());
                if let Some(items) = value.as_array() {
                    prop_assert!(items.iter().all(|v| !v.is_array() && !v.is_object()));
                }
            }
        }
    }
}
