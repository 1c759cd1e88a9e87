//! Nearest-neighbour indexes over precomputed `Embedding` node vectors.
//!
//! The embeddings file is produced offline alongside the graph:
//!
//! ```text
//! { "model": "all-minilm", "dim": 384,
//!   "items": [ { "embedding_id": 812, "vector": [0.01, ...] }, ... ] }
//! ```
//!
//! `embedding_id` is the store identity of the `Embedding` node the vector
//! was computed for. Distances are cosine distances (`1 - cos`).

use hnsw_rs::prelude::{DistCosine, Hnsw};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::vector::VectorError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingItem {
    pub embedding_id: i64,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingFile {
    #[serde(default)]
    pub model: Option<String>,
    pub dim: usize,
    #[serde(default)]
    pub items: Vec<EmbeddingItem>,
}

impl EmbeddingFile {
    pub fn load(path: &Path) -> Result<Self, VectorError> {
        let bytes = std::fs::read(path).map_err(|source| VectorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: EmbeddingFile = serde_json::from_slice(&bytes).map_err(|source| VectorError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        file.validate()?;
        Ok(file)
    }

    /// Every vector must have `dim` finite components.
    pub fn validate(&self) -> Result<(), VectorError> {
        if self.dim == 0 {
            return Err(VectorError::Index("embedding dimension must be positive".to_string()));
        }
        for item in &self.items {
            if item.vector.len() != self.dim {
                return Err(VectorError::Index(format!(
                    "embedding {} has {} dimensions, expected {}",
                    item.embedding_id,
                    item.vector.len(),
                    self.dim
                )));
            }
            if item.vector.iter().any(|x| !x.is_finite()) {
                return Err(VectorError::Index(format!(
                    "embedding {} has non-finite components",
                    item.embedding_id
                )));
            }
        }
        Ok(())
    }
}

/// One nearest-neighbour match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    /// Position of the vector in the index.
    pub index: usize,
    pub distance: f32,
    pub embedding_node_id: i64,
}

pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;

    /// Model the indexed vectors were computed with, when recorded.
    fn model(&self) -> Option<&str>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` hits, nearest first.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>, VectorError>;
}

fn check_dim(expected: usize, query: &[f32]) -> Result<(), VectorError> {
    if query.len() == expected {
        Ok(())
    } else {
        Err(VectorError::Dimension {
            expected,
            got: query.len(),
        })
    }
}

// ============================================================================
// HNSW
// ============================================================================

const HNSW_MAX_CONNECTIONS: usize = 16;
const HNSW_EF_CONSTRUCTION: usize = 200;
const HNSW_EF_SEARCH: usize = 64;

/// Approximate index backed by `hnsw_rs`.
pub struct HnswVectorIndex {
    model: Option<String>,
    dim: usize,
    ids: Vec<i64>,
    hnsw: Option<Mutex<Hnsw<'static, f32, DistCosine>>>,
}

impl std::fmt::Debug for HnswVectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswVectorIndex")
            .field("model", &self.model)
            .field("dim", &self.dim)
            .field("len", &self.ids.len())
            .finish()
    }
}

impl HnswVectorIndex {
    pub fn from_path(path: &Path) -> Result<Self, VectorError> {
        let file = EmbeddingFile::load(path)?;
        info!(path = %path.display(), items = file.items.len(), "loaded embeddings");
        Self::build(file)
    }

    pub fn build(file: EmbeddingFile) -> Result<Self, VectorError> {
        file.validate()?;
        let ids: Vec<i64> = file.items.iter().map(|i| i.embedding_id).collect();
        let hnsw = if file.items.is_empty() {
            None
        } else {
            let nb_elem = file.items.len();
            let max_layer = 16.min((nb_elem as f32).ln().trunc() as usize).max(1);
            let hnsw = Hnsw::<f32, DistCosine>::new(
                HNSW_MAX_CONNECTIONS,
                nb_elem,
                max_layer,
                HNSW_EF_CONSTRUCTION,
                DistCosine {},
            );
            for (i, item) in file.items.iter().enumerate() {
                hnsw.insert((&item.vector[..], i));
            }
            Some(Mutex::new(hnsw))
        };
        debug!(points = ids.len(), dim = file.dim, "hnsw index built");
        Ok(Self {
            model: file.model,
            dim: file.dim,
            ids,
            hnsw,
        })
    }
}

impl VectorIndex for HnswVectorIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>, VectorError> {
        check_dim(self.dim, query)?;
        let Some(hnsw) = &self.hnsw else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }
        let neighbours = hnsw.lock().search(query, k, HNSW_EF_SEARCH.max(k));
        let mut hits: Vec<VectorHit> = neighbours
            .into_iter()
            .filter_map(|n| {
                let embedding_node_id = *self.ids.get(n.d_id)?;
                Some(VectorHit {
                    index: n.d_id,
                    distance: n.distance,
                    embedding_node_id,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }
}

// ============================================================================
// Exact scan
// ============================================================================

/// Exact cosine scan; fine for small corpora.
#[derive(Debug, Clone)]
pub struct FlatVectorIndex {
    file: EmbeddingFile,
}

impl FlatVectorIndex {
    pub fn new(file: EmbeddingFile) -> Result<Self, VectorError> {
        file.validate()?;
        Ok(Self { file })
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    1.0 - dot / (na * nb)
}

impl VectorIndex for FlatVectorIndex {
    fn dim(&self) -> usize {
        self.file.dim
    }

    fn model(&self) -> Option<&str> {
        self.file.model.as_deref()
    }

    fn len(&self) -> usize {
        self.file.items.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>, VectorError> {
        check_dim(self.file.dim, query)?;
        let mut hits: Vec<VectorHit> = self
            .file
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| VectorHit {
                index,
                distance: cosine_distance(query, &item.vector),
                embedding_node_id: item.embedding_id,
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.index.cmp(&b.index)));
        hits.truncate(k);
        Ok(hits)
    }
}
