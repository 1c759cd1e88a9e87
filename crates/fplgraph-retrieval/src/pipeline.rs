//! One pass per utterance.
//!
//! ```text
//!   text ─► EntityResolver ─► intents (caller or local fallback, ≤ max_intents)
//!                                 │
//!             ┌───────────────────┼───────────────────┐        VectorRetriever
//!             ▼                   ▼                   ▼              │
//!      bind + execute      bind + execute      bind + execute        │
//!             └───────────────────┼───────────────────┘              │
//!                                 ▼  (barrier)                       ▼
//!                  Canonicalizer::merge_all(intent fragments, vector fragment)
//!                                 │
//!                                 ▼
//!                              project
//! ```
//!
//! Failures stay with the intent that produced them; the outcome lists only
//! intents that executed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use fplgraph_cypher::{classify_local, BindingError, QueryBinder, RowLimit, MAX_LOCAL_INTENTS};
use fplgraph_entities::{EntityBag, EntityResolver, Vocabulary, VocabularySource};
use fplgraph_graph::{project, CanonicalGraph, Canonicalizer, GraphFragment, VisGraph};
use fplgraph_store::{GraphStore, Row};

use crate::executor::GraphAugmentingExecutor;
use crate::vector::{VectorResult, VectorRetriever, VECTOR_TOP_K};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Template queries only.
    #[default]
    Cypher,
    Vector,
    Hybrid,
}

impl RetrievalMode {
    pub fn uses_templates(self) -> bool {
        matches!(self, RetrievalMode::Cypher | RetrievalMode::Hybrid)
    }

    pub fn uses_vectors(self) -> bool {
        matches!(self, RetrievalMode::Vector | RetrievalMode::Hybrid)
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RetrievalMode::Cypher => "cypher",
            RetrievalMode::Vector => "vector",
            RetrievalMode::Hybrid => "hybrid",
        })
    }
}

impl FromStr for RetrievalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cypher" | "baseline" => Ok(RetrievalMode::Cypher),
            "vector" | "embeddings" => Ok(RetrievalMode::Vector),
            "hybrid" => Ok(RetrievalMode::Hybrid),
            other => Err(format!("unknown retrieval mode `{other}` (cypher, vector, hybrid)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: RetrievalMode,
    pub max_intents: usize,
    pub limit: RowLimit,
    /// Per store call.
    pub timeout_secs: Option<u64>,
    pub top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: RetrievalMode::default(),
            max_intents: MAX_LOCAL_INTENTS,
            limit: RowLimit::default(),
            timeout_secs: Some(30),
            top_k: VECTOR_TOP_K,
        }
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of one intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntentResult {
    pub intent: String,
    pub query_text: String,
    pub parameters: Map<String, Value>,
    pub rows: Vec<Row>,
    pub error: Option<String>,
    #[serde(skip)]
    pub fragment: GraphFragment,
}

impl IntentResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// What the answer layer sees: scalar row values only, no topology.
    pub fn answer_context(&self) -> Value {
        let rows: Vec<Value> = self
            .rows
            .iter()
            .map(|row| {
                Value::Object(
                    row.iter()
                        .filter(|(_, v)| is_scalar(v))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )
            })
            .collect();
        serde_json::json!({
            "intent": self.intent,
            "query": self.query_text,
            "parameters": self.parameters,
            "rows": rows,
        })
    }
}

fn is_scalar(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().all(|v| !v.is_array() && !v.is_object()),
        Value::Object(_) => false,
        _ => true,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineOutcome {
    pub text: String,
    pub mode: RetrievalMode,
    pub entities: EntityBag,
    /// Intents attempted, in order.
    pub intents: Vec<String>,
    /// Intents that executed, in intent order.
    pub results: Vec<IntentResult>,
    /// Intents that failed to bind or execute.
    pub failed: Vec<IntentResult>,
    pub vector: Option<VectorResult>,
    pub graph: CanonicalGraph,
    pub view: VisGraph,
}

impl PipelineOutcome {
    pub fn answer_context(&self) -> Vec<Value> {
        self.results.iter().map(IntentResult::answer_context).collect()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct RetrievalPipeline {
    resolver: EntityResolver,
    vocabulary: Arc<dyn VocabularySource>,
    executor: GraphAugmentingExecutor,
    vector: Option<VectorRetriever>,
    canonicalizer: Canonicalizer,
    config: PipelineConfig,
}

impl fmt::Debug for RetrievalPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievalPipeline")
            .field("config", &self.config)
            .field("vector", &self.vector)
            .finish_non_exhaustive()
    }
}

impl RetrievalPipeline {
    pub fn new(
        resolver: EntityResolver,
        vocabulary: Arc<dyn VocabularySource>,
        store: Arc<dyn GraphStore>,
        config: PipelineConfig,
    ) -> Self {
        let executor = GraphAugmentingExecutor::new(store).with_timeout(config.timeout());
        Self {
            resolver,
            vocabulary,
            executor,
            vector: None,
            canonicalizer: Canonicalizer::new(),
            config,
        }
    }

    pub fn with_vector(mut self, retriever: VectorRetriever) -> Self {
        self.vector = Some(retriever.with_top_k(self.config.top_k));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn executor(&self) -> &GraphAugmentingExecutor {
        &self.executor
    }

    pub async fn resolve(&self, text: &str) -> EntityBag {
        let vocab = match self.vocabulary.load().await {
            Ok(vocab) => vocab,
            Err(err) => {
                warn!(error = %err, "vocabulary unavailable; resolving without names");
                Arc::new(Vocabulary::default())
            }
        };
        self.resolver.resolve(text, &vocab)
    }

    /// Run one utterance. `intents` overrides the local fallback when
    /// non-empty.
    pub async fn run(&self, text: &str, intents: &[String]) -> PipelineOutcome {
        let entities = self.resolve(text).await;
        let intents = self.select_intents(text, &entities, intents);
        info!(mode = %self.config.mode, intents = ?intents, "retrieval started");

        let templates = async {
            if self.config.mode.uses_templates() {
                self.run_intents(&intents, &entities).await
            } else {
                Vec::new()
            }
        };
        let vector = async {
            if !self.config.mode.uses_vectors() {
                return None;
            }
            let Some(retriever) = &self.vector else {
                warn!("vector retrieval requested but no index is configured");
                return None;
            };
            match retriever.retrieve(&entities, text).await {
                Ok(result) => Some(result),
                Err(err) => {
                    warn!(error = %err, "vector retrieval failed; continuing without it");
                    None
                }
            }
        };
        let (outcomes, vector) = tokio::join!(templates, vector);

        let (results, failed): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(IntentResult::is_ok);
        for f in &failed {
            warn!(intent = %f.intent, error = f.error.as_deref().unwrap_or_default(), "intent dropped");
        }

        let graph = self.canonicalizer.merge_all(
            results.iter().map(|r| &r.fragment),
            vector.as_ref().map(|v| &v.fragment),
        );
        let view = project(&graph);
        info!(
            results = results.len(),
            failed = failed.len(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "retrieval finished"
        );

        PipelineOutcome {
            text: text.to_string(),
            mode: self.config.mode,
            entities,
            intents,
            results,
            failed,
            vector,
            graph,
            view,
        }
    }

    pub async fn close(&self) {
        self.executor.store().close().await;
    }

    fn select_intents(&self, text: &str, bag: &EntityBag, requested: &[String]) -> Vec<String> {
        let candidates: Vec<String> = if requested.is_empty() {
            classify_local(text, bag).into_iter().map(str::to_string).collect()
        } else {
            requested.to_vec()
        };
        let mut out: Vec<String> = Vec::new();
        for id in candidates {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out.truncate(self.config.max_intents.max(1));
        out
    }

    /// Bind and execute every intent concurrently; results come back in
    /// intent order.
    async fn run_intents(&self, intents: &[String], bag: &EntityBag) -> Vec<IntentResult> {
        let mut set = JoinSet::new();
        for (position, intent) in intents.iter().enumerate() {
            let executor = self.executor.clone();
            let intent = intent.clone();
            let bag = bag.clone();
            let limit = self.config.limit;
            set.spawn(async move { (position, run_intent(&executor, intent, &bag, limit).await) });
        }

        let mut done: Vec<(usize, IntentResult)> = Vec::with_capacity(intents.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(item) => done.push(item),
                Err(err) => warn!(error = %err, "intent task aborted"),
            }
        }
        in_intent_order(intents, done)
    }
}

/// Order finished results by intent position. A position with no result
/// (its task panicked or was cancelled) is reported as a failed intent.
fn in_intent_order(intents: &[String], done: Vec<(usize, IntentResult)>) -> Vec<IntentResult> {
    let mut slots: Vec<Option<IntentResult>> = intents.iter().map(|_| None).collect();
    for (position, result) in done {
        if let Some(slot) = slots.get_mut(position) {
            *slot = Some(result);
        }
    }
    slots
        .into_iter()
        .zip(intents)
        .map(|(slot, intent)| {
            slot.unwrap_or_else(|| IntentResult {
                intent: intent.clone(),
                error: Some("intent task did not complete".to_string()),
                ..Default::default()
            })
        })
        .collect()
}

async fn run_intent(
    executor: &GraphAugmentingExecutor,
    intent: String,
    bag: &EntityBag,
    limit: RowLimit,
) -> IntentResult {
    let bound = match QueryBinder::bind(&intent, bag, limit) {
        Ok(bound) => bound,
        Err(err) => {
            let (query_text, parameters) = match &err {
                BindingError::Missing {
                    query_text,
                    parameters,
                    ..
                } => (query_text.trim().to_string(), parameters.clone()),
                _ => (String::new(), Map::new()),
            };
            debug!(%intent, error = %err, "binding failed");
            return IntentResult {
                intent,
                query_text,
                parameters,
                error: Some(err.to_string()),
                ..Default::default()
            };
        }
    };

    match executor.execute(&bound).await {
        Ok(out) => IntentResult {
            intent,
            query_text: bound.text,
            parameters: bound.parameters,
            rows: out.rows,
            error: None,
            fragment: out.fragment,
        },
        Err(err) => IntentResult {
            intent,
            query_text: bound.text,
            parameters: bound.parameters,
            error: Some(err.to_string()),
            ..Default::default()
        },
    }
}
