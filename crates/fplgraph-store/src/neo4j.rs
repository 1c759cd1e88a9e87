//! Neo4j over the HTTP transactional API.
//!
//! Every call is a single auto-commit transaction:
//!
//! ```text
//! POST {base}/db/{database}/tx/commit
//! {"statements": [{"statement": ..., "parameters": {...},
//!                  "resultDataContents": ["row", "graph"]}]}
//! ```
//!
//! The `row` view becomes [`QueryOutput::rows`]; the `graph` view (every
//! node and relationship the row references) becomes the fragment.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use fplgraph_graph::{GraphFragment, Properties, RawEdge, RawNode};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::graph_store::{GraphStore, QueryOutput, Row};

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TxResponse {
    #[serde(default)]
    pub results: Vec<TxResult>,
    #[serde(default)]
    pub errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
pub struct TxResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
pub struct TxRow {
    #[serde(default)]
    pub row: Vec<Value>,
    #[serde(default)]
    pub graph: Option<TxGraph>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TxGraph {
    #[serde(default)]
    pub nodes: Vec<TxNode>,
    #[serde(default)]
    pub relationships: Vec<TxRelationship>,
}

#[derive(Debug, Deserialize)]
pub struct TxNode {
    pub id: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Deserialize)]
pub struct TxRelationship {
    pub id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(rename = "startNode")]
    pub start_node: String,
    #[serde(rename = "endNode")]
    pub end_node: String,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Deserialize)]
pub struct TxError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Convert a decoded response into rows plus a deduplicated fragment.
pub fn decode_response(response: TxResponse) -> Result<QueryOutput, StoreError> {
    if let Some(err) = response.errors.into_iter().next() {
        return Err(StoreError::Neo4j {
            code: err.code,
            message: err.message,
        });
    }
    let result = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::Malformed("no result for statement".to_string()))?;

    let mut rows = Vec::with_capacity(result.data.len());
    let mut fragment = GraphFragment::new();
    for data in result.data {
        if data.row.len() != result.columns.len() {
            return Err(StoreError::Malformed(format!(
                "row has {} values for {} columns",
                data.row.len(),
                result.columns.len()
            )));
        }
        let row: Row = result.columns.iter().cloned().zip(data.row).collect();
        rows.push(row);

        let graph = data.graph.unwrap_or_default();
        for n in graph.nodes {
            fragment.add_node(RawNode {
                id: n.id,
                labels: n.labels,
                properties: n.properties,
            });
        }
        for r in graph.relationships {
            fragment.add_edge(RawEdge {
                id: r.id,
                rel_type: r.rel_type,
                start: r.start_node,
                end: r.end_node,
                properties: r.properties,
            });
        }
    }
    Ok(QueryOutput {
        columns: result.columns,
        rows,
        fragment,
    })
}

// ============================================================================
// Client
// ============================================================================

pub struct Neo4jHttpStore {
    client: Client,
    endpoint: String,
    config: StoreConfig,
    closed: AtomicBool,
}

impl Neo4jHttpStore {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let endpoint = config.commit_endpoint()?;
        let client = Client::builder()
            .pool_max_idle_per_host(config.max_pool_size)
            .connect_timeout(config.connect_timeout())
            .build()?;
        debug!(%endpoint, "neo4j http client ready");
        Ok(Self {
            client,
            endpoint,
            config,
            closed: AtomicBool::new(false),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GraphStore for Neo4jHttpStore {
    async fn run(&self, query: &str, params: &Map<String, Value>) -> Result<QueryOutput, StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        let body = json!({
            "statements": [{
                "statement": query,
                "parameters": params,
                "resultDataContents": ["row", "graph"],
            }]
        });
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "neo4j request rejected");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        let decoded: TxResponse = serde_json::from_slice(&bytes)?;
        let output = decode_response(decoded)?;
        debug!(
            rows = output.rows.len(),
            nodes = output.fragment.nodes.len(),
            edges = output.fragment.edges.len(),
            "neo4j query complete"
        );
        Ok(output)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(endpoint = %self.endpoint, "neo4j http client closed");
        }
    }
}
