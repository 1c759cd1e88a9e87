//! FPLGraph store client.
//!
//! - [`GraphStore`]: the async seam (`run` a Cypher statement, `close`)
//! - [`Neo4jHttpStore`]: pooled client for the Neo4j HTTP transaction API
//! - [`ScriptedStore`]: in-memory replies for tests and offline runs
//! - [`StoreVocabulary`]: team/player names for entity resolution
//!
//! Clients are constructed explicitly and shared as `Arc<dyn GraphStore>`;
//! there is no process-wide connection.

pub mod config;
pub mod error;
pub mod graph_store;
pub mod memory;
pub mod neo4j;
pub mod vocabulary;

pub use config::StoreConfig;
pub use error::StoreError;
pub use graph_store::{GraphStore, QueryOutput, Row};
pub use memory::{RecordedCall, ScriptedStore};
pub use neo4j::Neo4jHttpStore;
pub use vocabulary::StoreVocabulary;
