//! Authoritative team and player names.
//!
//! The resolver scores utterances against the names that actually exist in
//! the graph. Those lists come from a [`VocabularySource`]; in production
//! that is the graph store, wrapped in a [`CachedVocabulary`] so repeated
//! questions do not re-read thousands of player names.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Flat name lists, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub teams: Vec<String>,
    pub players: Vec<String>,
}

impl Vocabulary {
    pub fn new<T, P>(teams: T, players: P) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            teams: teams.into_iter().map(Into::into).collect(),
            players: players.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VocabularyError {
    #[error("vocabulary source `{source_name}` failed: {message}")]
    Unavailable { source_name: String, message: String },
}

/// Supplies the current team and player vocabulary.
#[async_trait]
pub trait VocabularySource: Send + Sync {
    async fn load(&self) -> Result<Arc<Vocabulary>, VocabularyError>;

    fn name(&self) -> &str {
        "vocabulary"
    }
}

#[async_trait]
impl<T: VocabularySource + ?Sized> VocabularySource for Arc<T> {
    async fn load(&self) -> Result<Arc<Vocabulary>, VocabularyError> {
        (**self).load().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Fixed in-memory vocabulary.
#[derive(Debug, Clone, Default)]
pub struct StaticVocabulary {
    vocab: Arc<Vocabulary>,
}

impl StaticVocabulary {
    pub fn new(vocab: Vocabulary) -> Self {
        Self {
            vocab: Arc::new(vocab),
        }
    }
}

#[async_trait]
impl VocabularySource for StaticVocabulary {
    async fn load(&self) -> Result<Arc<Vocabulary>, VocabularyError> {
        Ok(self.vocab.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

// ============================================================================
// Read-through cache
// ============================================================================

struct Snapshot {
    vocab: Arc<Vocabulary>,
    /// Last load or failed refresh; `None` once invalidated.
    loaded_at: Option<Instant>,
}

/// Read-through cache over another source with bounded staleness.
///
/// A snapshot older than `max_age` (or explicitly invalidated) is refreshed
/// on the next read. When the refresh fails the previous snapshot keeps being
/// served; with no previous snapshot the vocabulary is empty.
pub struct CachedVocabulary<S> {
    source: S,
    max_age: Duration,
    state: RwLock<Option<Snapshot>>,
}

impl<S: VocabularySource> CachedVocabulary<S> {
    pub fn new(source: S, max_age: Duration) -> Self {
        Self {
            source,
            max_age,
            state: RwLock::new(None),
        }
    }

    /// Current vocabulary, refreshing first if the snapshot is stale.
    pub async fn get(&self) -> Arc<Vocabulary> {
        if let Some(fresh) = self.fresh() {
            return fresh;
        }

        match self.source.load().await {
            Ok(vocab) => {
                debug!(
                    source = self.source.name(),
                    teams = vocab.teams.len(),
                    players = vocab.players.len(),
                    "vocabulary refreshed"
                );
                *self.state.write() = Some(Snapshot {
                    vocab: vocab.clone(),
                    loaded_at: Some(Instant::now()),
                });
                vocab
            }
            Err(err) => match self.state.write().as_mut() {
                Some(previous) => {
                    warn!(error = %err, "vocabulary refresh failed; serving previous snapshot");
                    // Retry after another `max_age`, not on every read.
                    previous.loaded_at = Some(Instant::now());
                    previous.vocab.clone()
                }
                None => {
                    warn!(error = %err, "vocabulary unavailable; resolving without names");
                    Arc::new(Vocabulary::default())
                }
            },
        }
    }

    /// Force a refresh on the next read.
    pub fn invalidate(&self) {
        if let Some(snapshot) = self.state.write().as_mut() {
            snapshot.loaded_at = None;
        }
    }

    fn fresh(&self) -> Option<Arc<Vocabulary>> {
        let state = self.state.read();
        let snapshot = state.as_ref()?;
        let loaded_at = snapshot.loaded_at?;
        (loaded_at.elapsed() <= self.max_age).then(|| snapshot.vocab.clone())
    }
}

#[async_trait]
impl<S: VocabularySource> VocabularySource for CachedVocabulary<S> {
    async fn load(&self) -> Result<Arc<Vocabulary>, VocabularyError> {
        Ok(self.get().await)
    }

    fn name(&self) -> &str {
        self.source.name()
    }
}
