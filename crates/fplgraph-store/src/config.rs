//! Connection settings for the graph store.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `bolt://`, `neo4j://` (and `+s` variants) or a plain `http(s)://` URI.
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_pool_size: usize,
    pub connect_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            max_pool_size: 20,
            connect_timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    /// Read `NEO4J_URI`, `NEO4J_USERNAME`, `NEO4J_PASSWORD` (all required) and
    /// `NEO4J_DATABASE`.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        let (uri, user, password) = (get("NEO4J_URI"), get("NEO4J_USERNAME"), get("NEO4J_PASSWORD"));
        let missing: Vec<&str> = [
            ("NEO4J_URI", uri.is_none()),
            ("NEO4J_USERNAME", user.is_none()),
            ("NEO4J_PASSWORD", password.is_none()),
        ]
        .into_iter()
        .filter_map(|(k, absent)| absent.then_some(k))
        .collect();
        let (Some(uri), Some(user), Some(password)) = (uri, user, password) else {
            return Err(StoreError::Config(format!("missing {}", missing.join(", "))));
        };
        let defaults = Self::default();
        Ok(Self {
            uri,
            user,
            password,
            database: get("NEO4J_DATABASE").unwrap_or(defaults.database),
            ..defaults
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// HTTP base URL for the configured URI.
    ///
    /// Driver schemes map onto the HTTP connector: `bolt`/`neo4j` → `http`
    /// (port 7687 → 7474), `+s`/`+ssc` variants → `https` (7687 → 7473).
    pub fn http_base(&self) -> Result<String, StoreError> {
        let uri = self.uri.trim().trim_end_matches('/');
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| StoreError::Config(format!("`{uri}` has no scheme")))?;
        let (http_scheme, http_port) = match scheme {
            "http" | "https" => return Ok(uri.to_string()),
            "bolt" | "neo4j" => ("http", "7474"),
            "bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc" => ("https", "7473"),
            other => return Err(StoreError::Config(format!("unsupported scheme `{other}`"))),
        };
        let host = match rest.rsplit_once(':') {
            Some((host, "7687")) => format!("{host}:{http_port}"),
            _ => rest.to_string(),
        };
        Ok(format!("{http_scheme}://{host}"))
    }

    /// Transaction-commit endpoint for the configured database.
    pub fn commit_endpoint(&self) -> Result<String, StoreError> {
        Ok(format!("{}/db/{}/tx/commit", self.http_base()?, self.database))
    }
}
