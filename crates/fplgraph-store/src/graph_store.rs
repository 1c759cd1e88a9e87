//! The store seam used by the executor and the vector retriever.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use fplgraph_graph::GraphFragment;

use crate::error::StoreError;

/// One row: column name → value.
pub type Row = Map<String, Value>;

/// Rows plus whatever graph elements those rows referenced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    #[serde(default)]
    pub fragment: GraphFragment,
}

impl QueryOutput {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let columns = rows
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            columns,
            rows,
            fragment: GraphFragment::new(),
        }
    }

    pub fn with_fragment(mut self, fragment: GraphFragment) -> Self {
        self.fragment = fragment;
        self
    }

    /// Values of `column` in row order, nulls skipped.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows
            .iter()
            .filter_map(move |r| r.get(column))
            .filter(|v| !v.is_null())
    }
}

/// A Cypher endpoint. Implementations must be shareable across tasks.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn run(&self, query: &str, params: &Map<String, Value>) -> Result<QueryOutput, StoreError>;

    /// Release pooled resources; later calls fail with [`StoreError::Closed`].
    async fn close(&self);
}

#[async_trait]
impl<T: GraphStore + ?Sized> GraphStore for Arc<T> {
    async fn run(&self, query: &str, params: &Map<String, Value>) -> Result<QueryOutput, StoreError> {
        (**self).run(query, params).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}
