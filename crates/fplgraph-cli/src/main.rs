//! FPLGraph CLI
//!
//! Question answering support over a Fantasy Premier League graph:
//! - Resolve the entities in a question (`entities`)
//! - Browse the query template catalog (`templates`)
//! - Show how a question binds to a template and what topology it extracts (`explain`)
//! - Run template, vector or hybrid retrieval (`ask`)

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use fplgraph_cypher::{extraction_query, BindingError, Catalog, QueryBinder, RowLimit};
use fplgraph_entities::{
    CachedVocabulary, EntityBag, EntityResolver, StaticVocabulary, Vocabulary, VocabularySource,
};
use fplgraph_graph::render_html;
use fplgraph_retrieval::{
    Embedder, EmbeddingConfig, GraphAugmentingExecutor, HnswVectorIndex, NamedIndex,
    OllamaEmbedder, PipelineConfig, RetrievalMode, RetrievalPipeline, TokenHashEmbedder, VectorIndex,
    VectorRetriever,
};
use fplgraph_store::{GraphStore, Neo4jHttpStore, StoreConfig, StoreVocabulary};

mod output;

const VOCABULARY_MAX_AGE: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "fplgraph")]
#[command(author, version, about = "FPLGraph: graph retrieval for Fantasy Premier League questions")]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the entities found in a question as JSON.
    Entities {
        text: String,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// List query templates, or show one.
    Templates {
        #[arg(long)]
        id: Option<String>,
    },

    /// Show the bound query and derived extraction query without executing.
    Explain {
        #[arg(long)]
        intent: String,

        text: String,

        #[arg(long, default_value_t = RowLimit::DEFAULT.get())]
        limit: u32,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Answer a question: resolve, bind, execute, merge.
    Ask {
        text: String,

        /// Template id to run (repeatable); defaults to the keyword fallback
        #[arg(long = "intent")]
        intents: Vec<String>,

        /// cypher, vector or hybrid
        #[arg(long, default_value = "cypher", env = "FPLGRAPH_MODE")]
        mode: RetrievalMode,

        #[arg(long, default_value_t = RowLimit::DEFAULT.get())]
        limit: u32,

        /// Per store call, in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Nearest neighbours for vector retrieval
        #[arg(long, default_value_t = fplgraph_retrieval::VECTOR_TOP_K)]
        top_k: usize,

        /// Embeddings file for vector retrieval, `name=path` or a bare path (repeatable)
        #[arg(long, env = "FPLGRAPH_EMBEDDINGS", value_delimiter = ',')]
        embeddings: Vec<NamedIndex>,

        /// Which named embeddings file to query; defaults to the first
        #[arg(long, env = "FPLGRAPH_EMBEDDINGS_SELECT")]
        embedding_model: Option<String>,

        /// Print the whole outcome as JSON
        #[arg(long)]
        json: bool,

        /// Write the merged graph as a standalone HTML page
        #[arg(long)]
        html: Option<PathBuf>,

        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct StoreArgs {
    #[arg(long, env = "NEO4J_URI")]
    uri: Option<String>,

    #[arg(long, env = "NEO4J_USERNAME")]
    user: Option<String>,

    #[arg(long, env = "NEO4J_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, env = "NEO4J_DATABASE")]
    database: Option<String>,

    /// Resolve without reading names from the graph
    #[arg(long)]
    offline: bool,
}

impl StoreArgs {
    fn config(&self) -> Result<StoreConfig> {
        let config = StoreConfig::from_lookup(|key| match key {
            "NEO4J_URI" => self.uri.clone(),
            "NEO4J_USERNAME" => self.user.clone(),
            "NEO4J_PASSWORD" => self.password.clone(),
            "NEO4J_DATABASE" => self.database.clone(),
            _ => None,
        })?;
        Ok(config)
    }

    fn connect(&self) -> Result<Arc<dyn GraphStore>> {
        let store = Neo4jHttpStore::new(self.config()?).context("failed to build the graph store client")?;
        info!(endpoint = store.endpoint(), "graph store configured");
        Ok(Arc::new(store))
    }

    /// Vocabulary for resolution: from the graph unless offline.
    fn vocabulary(&self) -> Result<(Arc<dyn VocabularySource>, Option<Arc<dyn GraphStore>>)> {
        if self.offline {
            let empty: Arc<dyn VocabularySource> = Arc::new(StaticVocabulary::new(Vocabulary::default()));
            return Ok((empty, None));
        }
        let store = self.connect()?;
        let source: Arc<dyn VocabularySource> = Arc::new(CachedVocabulary::new(
            StoreVocabulary::new(store.clone()),
            VOCABULARY_MAX_AGE,
        ));
        Ok((source, Some(store)))
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Entities { text, store } => cmd_entities(&text, &store).await,
        Commands::Templates { id } => cmd_templates(id.as_deref()),
        Commands::Explain {
            intent,
            text,
            limit,
            store,
        } => cmd_explain(&intent, &text, limit, &store).await,
        Commands::Ask {
            text,
            intents,
            mode,
            limit,
            timeout,
            top_k,
            embeddings,
            embedding_model,
            json,
            html,
            store,
        } => {
            let config = PipelineConfig {
                mode,
                limit: RowLimit::new(limit)?,
                timeout_secs: Some(timeout),
                top_k,
                ..Default::default()
            };
            let mut embedding = EmbeddingConfig::from_env();
            if !embeddings.is_empty() {
                embedding.indexes = embeddings;
            }
            if embedding_model.is_some() {
                embedding.selected = embedding_model;
            }
            cmd_ask(&text, &intents, config, embedding, json, html, &store).await
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn resolve(text: &str, store: &StoreArgs) -> Result<EntityBag> {
    let (vocabulary, client) = store.vocabulary()?;
    let vocab = vocabulary.load().await?;
    let bag = EntityResolver::new()?.resolve(text, &vocab);
    if let Some(client) = client {
        client.close().await;
    }
    Ok(bag)
}

async fn cmd_entities(text: &str, store: &StoreArgs) -> Result<()> {
    let bag = resolve(text, store).await?;
    println!("{}", serde_json::to_string_pretty(&bag)?);
    Ok(())
}

fn cmd_templates(id: Option<&str>) -> Result<()> {
    match id {
        Some(id) => {
            let template = Catalog::get(id).ok_or_else(|| anyhow!("unknown template `{id}`"))?;
            println!("{}", template.id.bold());
            println!("{}", template.description);
            println!("{} {}", "requires:".dimmed(), output::param_list(template.required));
            println!();
            println!("{}", template.body.trim());
        }
        None => {
            for template in Catalog::all() {
                println!(
                    "{:<52} {}",
                    template.id.cyan(),
                    output::param_list(template.required).dimmed()
                );
            }
            println!("\n{} templates", Catalog::all().len());
        }
    }
    Ok(())
}

async fn cmd_explain(intent: &str, text: &str, limit: u32, store: &StoreArgs) -> Result<()> {
    let bag = resolve(text, store).await?;
    let limit = RowLimit::new(limit)?;
    println!("{} {}", "entities:".dimmed(), serde_json::to_string(&bag)?);

    let bound = match QueryBinder::bind(intent, &bag, limit) {
        Ok(bound) => bound,
        Err(BindingError::Missing { missing, .. }) => {
            bail!(
                "{intent} cannot run for this question; missing {}",
                output::param_list(&missing)
            );
        }
        Err(err) => return Err(err.into()),
    };

    println!("\n{}", "query".bold());
    println!("{}", bound.text);
    println!("{} {}", "parameters:".dimmed(), serde_json::to_string(&bound.parameters)?);

    println!("\n{}", "extraction".bold());
    match extraction_query(&bound.text) {
        Some(x) => {
            println!("{}", x.text);
            println!("{} {}", "variables:".dimmed(), x.variables.join(", "));
        }
        None => println!("{}", "(no pattern to extract; rows only)".yellow()),
    }
    Ok(())
}

async fn cmd_ask(
    text: &str,
    intents: &[String],
    config: PipelineConfig,
    embedding: EmbeddingConfig,
    json: bool,
    html: Option<PathBuf>,
    store: &StoreArgs,
) -> Result<()> {
    let client = store.connect()?;
    let vocabulary = CachedVocabulary::new(StoreVocabulary::new(client.clone()), VOCABULARY_MAX_AGE);
    let mode = config.mode;
    let executor = GraphAugmentingExecutor::new(client.clone()).with_timeout(config.timeout());
    let mut pipeline = RetrievalPipeline::new(EntityResolver::new()?, Arc::new(vocabulary), client, config);

    if mode.uses_vectors() {
        if embedding.indexes.is_empty() {
            bail!("{mode} retrieval needs --embeddings or FPLGRAPH_EMBEDDINGS");
        }
        let selected = embedding.selected_index()?;
        let index = HnswVectorIndex::from_path(&selected.path)?;
        let embedder = embedder_for(&index, &embedding)?;
        debug!(embeddings = %selected.name, model = embedder.model(), "vector retrieval enabled");
        pipeline = pipeline.with_vector(VectorRetriever::new(embedder, Arc::new(index), executor));
    }

    let outcome = pipeline.run(text, intents).await;
    pipeline.close().await;

    if let Some(path) = html {
        let page = render_html(&outcome.view, text)?;
        std::fs::write(&path, page).with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("{} {}", "graph written to".dimmed(), path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        output::print_outcome(&outcome);
    }
    Ok(())
}

/// Indexes built with token hashing are queried the same way; anything else
/// goes to the embedding service.
fn embedder_for(index: &HnswVectorIndex, config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match index.model() {
        Some(model) if model.starts_with("token-hash") => Ok(Arc::new(TokenHashEmbedder::new(index.dim()))),
        Some(model) => {
            let config = EmbeddingConfig {
                model: model.to_string(),
                ..config.clone()
            };
            Ok(Arc::new(OllamaEmbedder::new(&config)?))
        }
        None => Ok(Arc::new(OllamaEmbedder::new(config)?)),
    }
}
