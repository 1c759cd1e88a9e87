//! FPLGraph retrieval.
//!
//! ```text
//!  ┌──────────────┐   ┌──────────────┐   ┌───────────────────────────┐
//!  │ EntityResolver│──►│ QueryBinder  │──►│ GraphAugmentingExecutor   │──┐
//!  └──────────────┘   └──────────────┘   │  rows + extraction query  │  │
//!         │                               └───────────────────────────┘  │
//!         │           ┌──────────────────────────────────────────┐       ▼
//!         └──────────►│ VectorRetriever: embed ─► index ─► store │──► Canonicalizer ─► project
//!                     └──────────────────────────────────────────┘
//! ```
//!
//! [`RetrievalPipeline`] wires the stages for one utterance; each stage is
//! usable on its own.

pub mod embedding;
pub mod executor;
pub mod index;
pub mod pipeline;
pub mod vector;

pub use embedding::{Embedder, EmbeddingConfig, NamedIndex, OllamaEmbedder, TokenHashEmbedder};
pub use executor::{ExecutionError, ExecutionOutput, GraphAugmentingExecutor, GraphExtractionError};
pub use index::{EmbeddingFile, EmbeddingItem, FlatVectorIndex, HnswVectorIndex, VectorHit, VectorIndex};
pub use pipeline::{IntentResult, PipelineConfig, PipelineOutcome, RetrievalMode, RetrievalPipeline};
pub use vector::{build_query_text, VectorError, VectorResult, VectorRetriever, VECTOR_TOP_K};
