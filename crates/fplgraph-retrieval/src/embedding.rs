//! Text embedders for the vector strategy.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use fplgraph_entities::fuzz::tokens;

use crate::vector::VectorError;

pub const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1:11434";
pub const DEFAULT_EMBED_MODEL: &str = "all-minilm";
pub const TOKEN_HASH_DIM: usize = 128;

// ============================================================================
// Configuration
// ============================================================================

/// One embeddings file, addressed by name.
///
/// Written `name=path` on the command line and in `FPLGRAPH_EMBEDDINGS`; a
/// bare path is named after its file stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedIndex {
    pub name: String,
    pub path: PathBuf,
}

impl FromStr for NamedIndex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, path) = match s.split_once('=') {
            Some((name, path)) => (name.trim().to_string(), PathBuf::from(path.trim())),
            None => {
                let path = PathBuf::from(s);
                let stem = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (stem, path)
            }
        };
        if name.is_empty() || path.as_os_str().is_empty() {
            return Err(format!("expected `name=path` or a file path, got `{s}`"));
        }
        Ok(Self { name, path })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub host: String,
    pub model: String,
    /// Precomputed embeddings for the graph's `Embedding` nodes, one file per
    /// embedding model.
    pub indexes: Vec<NamedIndex>,
    /// Which of `indexes` to query; the first when unset.
    pub selected: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            model: DEFAULT_EMBED_MODEL.to_string(),
            indexes: Vec::new(),
            selected: None,
            timeout_secs: 60,
        }
    }
}

impl EmbeddingConfig {
    /// Read `OLLAMA_HOST`, `FPLGRAPH_EMBED_MODEL`, `FPLGRAPH_EMBEDDINGS`
    /// (comma-separated `name=path` entries) and `FPLGRAPH_EMBEDDINGS_SELECT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();
        let indexes = get("FPLGRAPH_EMBEDDINGS")
            .map(|list| {
                list.split(',')
                    .filter_map(|entry| match entry.parse::<NamedIndex>() {
                        Ok(index) => Some(index),
                        Err(err) => {
                            warn!(%err, "ignoring embeddings entry");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            host: normalize_host(&get("OLLAMA_HOST").unwrap_or(defaults.host)),
            model: get("FPLGRAPH_EMBED_MODEL").unwrap_or(defaults.model),
            indexes,
            selected: get("FPLGRAPH_EMBEDDINGS_SELECT"),
            timeout_secs: defaults.timeout_secs,
        }
    }

    /// The embeddings file to query: `selected` by name, else the first.
    pub fn selected_index(&self) -> Result<&NamedIndex, VectorError> {
        match &self.selected {
            Some(name) => self.indexes.iter().find(|i| &i.name == name).ok_or_else(|| {
                let known: Vec<&str> = self.indexes.iter().map(|i| i.name.as_str()).collect();
                VectorError::Index(format!(
                    "no embeddings named `{name}` (known: {})",
                    if known.is_empty() { "none".to_string() } else { known.join(", ") }
                ))
            }),
            None => self
                .indexes
                .first()
                .ok_or_else(|| VectorError::Index("no embeddings file configured".to_string())),
        }
    }
}

fn normalize_host(host: &str) -> String {
    let mut host = host.trim().to_string();
    if host.is_empty() {
        host = DEFAULT_OLLAMA_HOST.to_string();
    }
    if !host.starts_with("http://") && !host.starts_with("https://") {
        host = format!("http://{host}");
    }
    host.trim_end_matches('/').to_string()
}

// ============================================================================
// Embedder seam
// ============================================================================

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name, compared against the index's model.
    fn model(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError>;
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Arc<T> {
    fn model(&self) -> &str {
        (**self).model()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        (**self).embed(text).await
    }
}

// ============================================================================
// Ollama
// ============================================================================

/// Embeddings from an Ollama server.
///
/// Prefers the batched `/api/embed` endpoint and falls back to the older
/// `/api/embeddings` when the server rejects it.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    host: String,
    model: String,
}

#[derive(Deserialize)]
struct EmbedResp {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct EmbeddingsResp {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, VectorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            host: normalize_host(&config.host),
            model: config.model.clone(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        let url = format!("{}/api/embed", self.host);
        let body = json!({
            "model": self.model,
            "input": [text],
            "truncate": true,
        });
        let resp = self.client.post(&url).json(&body).send().await?;
        if resp.status().is_success() {
            let out: EmbedResp = resp
                .json()
                .await
                .map_err(|e| VectorError::Embedding(format!("invalid /api/embed response: {e}")))?;
            return out
                .embeddings
                .into_iter()
                .next()
                .ok_or_else(|| VectorError::Embedding("/api/embed returned no embeddings".to_string()));
        }
        debug!(status = resp.status().as_u16(), "/api/embed rejected; trying /api/embeddings");

        let url = format!("{}/api/embeddings", self.host);
        let body = json!({ "model": self.model, "prompt": text });
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(VectorError::Embedding(format!(
                "ollama returned HTTP {}: {detail}",
                status.as_u16()
            )));
        }
        let out: EmbeddingsResp = resp
            .json()
            .await
            .map_err(|e| VectorError::Embedding(format!("invalid /api/embeddings response: {e}")))?;
        Ok(out.embedding)
    }
}

// ============================================================================
// Token hashing
// ============================================================================

/// Deterministic, offline embedder: signed feature hashing of normalised
/// tokens, L2-normalised. Useful for tests and for indexes built with the
/// same hashing.
#[derive(Debug, Clone)]
pub struct TokenHashEmbedder {
    dim: usize,
    model: String,
}

impl Default for TokenHashEmbedder {
    fn default() -> Self {
        Self::new(TOKEN_HASH_DIM)
    }
}

impl TokenHashEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self {
            dim,
            model: format!("token-hash-{dim}"),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        for t in tokens(text) {
            let h = fnv1a64(&t);
            let idx = (h % self.dim as u64) as usize;
            let sign = if (h >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        v
    }
}

fn fnv1a64(s: &str) -> u64 {
    let mut h: u64 = 14695981039346656037;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(1099511628211);
    }
    h
}

#[async_trait]
impl Embedder for TokenHashEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        Ok(self.embed_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn config_from_lookup() {
        let cfg = EmbeddingConfig::from_lookup(|k| match k {
            "OLLAMA_HOST" => Some("gpu-box:11434/".to_string()),
            "FPLGRAPH_EMBEDDINGS" => Some("/data/embeddings.json".to_string()),
            _ => None,
        });
        assert_eq!(cfg.host, "http://gpu-box:11434");
        assert_eq!(cfg.model, DEFAULT_EMBED_MODEL);
        assert_eq!(cfg.indexes.len(), 1);
        assert_eq!(cfg.indexes[0].name, "embeddings");
        assert_eq!(cfg.selected_index().unwrap().path, PathBuf::from("/data/embeddings.json"));

        let blank = EmbeddingConfig::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(blank, EmbeddingConfig::default());
    }

    #[test]
    fn named_indexes_are_selectable() {
        let cfg = EmbeddingConfig::from_lookup(|k| match k {
            "FPLGRAPH_EMBEDDINGS" => Some("minilm=/data/a.json, node2vec = /data/b.json,=oops".to_string()),
            "FPLGRAPH_EMBEDDINGS_SELECT" => Some("node2vec".to_string()),
            _ => None,
        });
        assert_eq!(
            cfg.indexes.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            vec!["minilm", "node2vec"]
        );
        assert_eq!(cfg.selected_index().unwrap().path, PathBuf::from("/data/b.json"));

        let first = EmbeddingConfig {
            selected: None,
            ..cfg.clone()
        };
        assert_eq!(first.selected_index().unwrap().name, "minilm");

        let unknown = EmbeddingConfig {
            selected: Some("fastrp".to_string()),
            ..cfg
        };
        let err = unknown.selected_index().unwrap_err().to_string();
        assert!(err.contains("fastrp") && err.contains("minilm, node2vec"), "{err}");

        assert!(EmbeddingConfig::default().selected_index().is_err());
        assert!("".parse::<NamedIndex>().is_err());
    }

    #[test]
    fn token_hash_is_normalised_and_stable() {
        let e = TokenHashEmbedder::default();
        let a = e.embed_text("Players: Mohamed Salah | Teams: Liverpool");
        assert_eq!(a.len(), TOKEN_HASH_DIM);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-5);
        assert_eq!(a, e.embed_text("players mohamed salah teams liverpool"));
    }

    #[test]
    fn empty_text_is_the_zero_vector() {
        let e = TokenHashEmbedder::new(8);
        assert!(e.embed_text("  ").iter().all(|x| *x == 0.0));
        assert_eq!(e.model(), "token-hash-8");
    }

    #[tokio::test]
    async fn unreachable_ollama_is_an_error() {
        let cfg = EmbeddingConfig {
            host: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let embedder = OllamaEmbedder::new(&cfg).unwrap();
        assert!(embedder.embed("salah").await.is_err());
    }
}
