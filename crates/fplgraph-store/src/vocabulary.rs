//! Team and player names read from the graph.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use fplgraph_entities::{Vocabulary, VocabularyError, VocabularySource};

use crate::graph_store::GraphStore;

pub const TEAM_NAMES_QUERY: &str = "MATCH (n:Team) RETURN n.name AS name";
pub const PLAYER_NAMES_QUERY: &str = "MATCH (n:Player) RETURN n.player_name AS name";

/// [`VocabularySource`] backed by a [`GraphStore`].
pub struct StoreVocabulary<S: ?Sized> {
    store: Arc<S>,
}

impl<S: GraphStore + ?Sized> StoreVocabulary<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn names(&self, query: &str) -> Result<Vec<String>, VocabularyError> {
        let out = self
            .store
            .run(query, &Map::new())
            .await
            .map_err(|e| VocabularyError::Unavailable {
                source_name: self.name().to_string(),
                message: e.to_string(),
            })?;
        let mut names: Vec<String> = Vec::with_capacity(out.rows.len());
        for value in out.column_values("name") {
            if let Value::String(s) = value {
                if !s.is_empty() && !names.contains(s) {
                    names.push(s.clone());
                }
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl<S: GraphStore + ?Sized> VocabularySource for StoreVocabulary<S> {
    async fn load(&self) -> Result<Arc<Vocabulary>, VocabularyError> {
        let teams = self.names(TEAM_NAMES_QUERY).await?;
        let players = self.names(PLAYER_NAMES_QUERY).await?;
        debug!(teams = teams.len(), players = players.len(), "vocabulary loaded from store");
        Ok(Arc::new(Vocabulary::new(teams, players)))
    }

    fn name(&self) -> &str {
        "graph-store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_store::QueryOutput;
    use crate::memory::ScriptedStore;
    use serde_json::json;

    fn rows(names: &[Value]) -> QueryOutput {
        QueryOutput::from_rows(
            names
                .iter()
                .map(|n| json!({ "name": n }).as_object().cloned().unwrap())
                .collect(),
        )
    }

    #[tokio::test]
    async fn loads_distinct_non_null_names() {
        let store = Arc::new(
            ScriptedStore::new()
                .on(TEAM_NAMES_QUERY, rows(&[json!("Arsenal"), json!("Chelsea"), json!("Arsenal")]))
                .on(PLAYER_NAMES_QUERY, rows(&[json!("Harry Kane"), Value::Null])),
        );
        let vocab = StoreVocabulary::new(store).load().await.unwrap();
        assert_eq!(vocab.teams, vec!["Arsenal", "Chelsea"]);
        assert_eq!(vocab.players, vec!["Harry Kane"]);
    }

    #[tokio::test]
    async fn store_failure_is_unavailable() {
        let store = Arc::new(ScriptedStore::new().fail_on("Team", "down"));
        let err = StoreVocabulary::new(store).load().await.unwrap_err();
        assert!(err.to_string().contains("graph-store"));
    }
}
