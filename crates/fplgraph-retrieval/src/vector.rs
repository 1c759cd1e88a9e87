//! Nearest-neighbour retrieval over `Embedding` nodes.
//!
//! ```text
//!   EntityBag ─► query text ─► Embedder ─► VectorIndex (top k)
//!                                              │ embedding ids
//!                          ┌───────────────────┴──────────────────┐
//!                          ▼                                      ▼
//!                 source rows (text, owner)          Embedding ── Player topology
//! ```
//!
//! The topology is the secondary fragment the canonicalizer folds into the
//! template-query graph.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use fplgraph_entities::EntityBag;
use fplgraph_graph::GraphFragment;
use fplgraph_store::{Row, StoreError};

use crate::embedding::Embedder;
use crate::executor::{ExecutionError, GraphAugmentingExecutor};
use crate::index::{VectorHit, VectorIndex};

pub const VECTOR_TOP_K: usize = 5;

pub const GENERAL_QUERY: &str = "General football query";

pub const FETCH_SOURCES_QUERY: &str = r#"
UNWIND $embedding_ids AS eid
MATCH (e:Embedding) WHERE id(e) = eid
OPTIONAL MATCH (src)-[:HAS_EMBEDDING]->(e)
RETURN
    id(e) AS embedding_id,
    e.model AS model,
    e.text AS text,
    id(src) AS source_node_id,
    e.source_label AS source_label,
    src.player_name AS player_name
"#;

pub const FETCH_GRAPH_QUERY: &str = r#"
UNWIND $embedding_ids AS eid
MATCH (e:Embedding) WHERE id(e) = eid
MATCH (e)-[r]-(p:Player)
RETURN
    collect(DISTINCT e) AS source_nodes,
    collect(DISTINCT p) AS neighbor_nodes,
    collect(DISTINCT r) AS edges
"#;

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("embedding service: {0}")]
    Embedding(String),

    #[error("embedding service transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding index: {0}")]
    Index(String),

    #[error("query vector has {got} dimensions, index expects {expected}")]
    Dimension { expected: usize, got: usize },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed embeddings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl From<StoreError> for VectorError {
    fn from(e: StoreError) -> Self {
        VectorError::Execution(ExecutionError::Store(e))
    }
}

/// Text embedded for a bag: one `Category: a, b` part per non-empty
/// category, joined by ` | `. Falls back to the raw utterance, then to
/// [`GENERAL_QUERY`].
pub fn build_query_text(bag: &EntityBag, raw: &str) -> String {
    fn part(out: &mut Vec<String>, name: &str, values: Vec<String>) {
        if !values.is_empty() {
            out.push(format!("{name}: {}", values.join(", ")));
        }
    }

    let mut parts = Vec::new();
    part(&mut parts, "Players", bag.players.clone());
    part(&mut parts, "Teams", bag.teams.clone());
    part(
        &mut parts,
        "Positions",
        bag.positions.iter().map(|p| p.code().to_string()).collect(),
    );
    part(
        &mut parts,
        "Seasons",
        bag.seasons.iter().map(|s| s.label().to_string()).collect(),
    );
    part(
        &mut parts,
        "Gameweeks",
        bag.gameweeks.iter().map(|g| g.to_string()).collect(),
    );
    part(
        &mut parts,
        "Statistics",
        bag.statistics.iter().map(|s| s.as_str().to_string()).collect(),
    );

    if !parts.is_empty() {
        return parts.join(" | ");
    }
    let raw = raw.trim();
    if raw.is_empty() {
        GENERAL_QUERY.to_string()
    } else {
        raw.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VectorResult {
    pub query_text: String,
    pub model: String,
    pub hits: Vec<VectorHit>,
    pub sources: Vec<Row>,
    pub fragment: GraphFragment,
}

pub struct VectorRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    executor: GraphAugmentingExecutor,
    top_k: usize,
}

impl std::fmt::Debug for VectorRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorRetriever")
            .field("model", &self.embedder.model())
            .field("index_len", &self.index.len())
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl VectorRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        executor: GraphAugmentingExecutor,
    ) -> Self {
        Self {
            embedder,
            index,
            executor,
            top_k: VECTOR_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub async fn retrieve(&self, bag: &EntityBag, raw: &str) -> Result<VectorResult, VectorError> {
        let query_text = build_query_text(bag, raw);
        let model = self.embedder.model().to_string();
        if let Some(indexed) = self.index.model() {
            if indexed != model {
                warn!(indexed, query = %model, "embedder and index models differ");
            }
        }
        debug!(%model, %query_text, "embedding query");

        let vector = self.embedder.embed(&query_text).await?;
        let hits = self.index.search(&vector, self.top_k)?;

        let mut ids: Vec<i64> = Vec::with_capacity(hits.len());
        for hit in &hits {
            if !ids.contains(&hit.embedding_node_id) {
                ids.push(hit.embedding_node_id);
            }
        }
        if ids.is_empty() {
            info!("vector search returned no hits");
            return Ok(VectorResult {
                query_text,
                model,
                hits,
                ..Default::default()
            });
        }

        let mut params = Map::new();
        params.insert("embedding_ids".to_string(), json!(ids));
        let (sources, graph) = tokio::try_join!(
            self.executor.call(FETCH_SOURCES_QUERY, &params),
            self.executor.call(FETCH_GRAPH_QUERY, &params),
        )?;

        info!(
            hits = hits.len(),
            sources = sources.rows.len(),
            nodes = graph.fragment.nodes.len(),
            edges = graph.fragment.edges.len(),
            "vector retrieval complete"
        );
        Ok(VectorResult {
            query_text,
            model,
            hits,
            sources: sources.rows,
            fragment: graph.fragment,
        })
    }
}

/// Embedding ids in a parameter map, for inspecting recorded calls.
pub fn embedding_ids(params: &Map<String, Value>) -> Vec<i64> {
    params
        .get("embedding_ids")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default()
}
