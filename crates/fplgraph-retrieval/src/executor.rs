//! Graph-augmenting execution of a bound template query.
//!
//! ```text
//!   BoundQuery ──┬──► store.run(text)              ──► rows        (authoritative)
//!                └──► extraction_query(text)
//!                        └─► store.run(extraction) ──► fragment    (best effort)
//! ```
//!
//! Both calls run concurrently and are combined once both finish. A failed
//! primary call fails the intent; a failed extraction only loses topology.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use fplgraph_cypher::{extraction_query, BoundQuery};
use fplgraph_graph::GraphFragment;
use fplgraph_store::{GraphStore, QueryOutput, Row, StoreError};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("store call did not finish within {0:?}")]
    Timeout(Duration),
}

/// Topology harvesting failed. Never fatal.
#[derive(Debug, Error)]
#[error("graph extraction failed for {template_id}: {source}")]
pub struct GraphExtractionError {
    pub template_id: String,
    #[source]
    pub source: ExecutionError,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Nodes unique by store identity, relationships by (start, type, end).
    pub fragment: GraphFragment,
    /// The derived extraction query, when the template had one.
    pub extraction: Option<String>,
}

#[derive(Clone)]
pub struct GraphAugmentingExecutor {
    store: Arc<dyn GraphStore>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for GraphAugmentingExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphAugmentingExecutor")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GraphAugmentingExecutor {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    /// Bound every store call made by this executor.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub async fn execute(&self, query: &BoundQuery) -> Result<ExecutionOutput, ExecutionError> {
        let extraction = extraction_query(&query.text);
        if extraction.is_none() {
            debug!(template = %query.template_id, "no pattern to extract; rows only");
        }

        let primary = self.call(&query.text, &query.parameters);
        let topology = async {
            match &extraction {
                Some(x) => Some(self.call(&x.text, &query.parameters).await),
                None => None,
            }
        };
        let (primary, topology) = tokio::join!(primary, topology);
        let primary = primary?;

        let fragment = match topology {
            Some(Ok(out)) => out.fragment,
            Some(Err(source)) => {
                let err = GraphExtractionError {
                    template_id: query.template_id.clone(),
                    source,
                };
                warn!(error = %err, "continuing without topology");
                GraphFragment::new()
            }
            None => GraphFragment::new(),
        };

        debug!(
            template = %query.template_id,
            rows = primary.rows.len(),
            nodes = fragment.nodes.len(),
            edges = fragment.edges.len(),
            "intent executed"
        );
        Ok(ExecutionOutput {
            columns: primary.columns,
            rows: primary.rows,
            fragment,
            extraction: extraction.map(|x| x.text),
        })
    }

    /// One store call under the configured timeout.
    pub async fn call(&self, text: &str, params: &Map<String, Value>) -> Result<QueryOutput, ExecutionError> {
        let run = self.store.run(text, params);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| ExecutionError::Timeout(limit))?
                .map_err(ExecutionError::from),
            None => run.await.map_err(ExecutionError::from),
        }
    }
}
