//! Relevance scoring: ranks chunks against a query.
//!
//! Two interchangeable [`RelevanceStrategy`] implementations do the ranking;
//! [`Scorer`] wraps them with the selection policy that guarantees the
//! pipeline always gets *some* context when the knowledge base is non-empty:
//!
//! 1. primary strategy fails → secondary (if any) → first `top_k` chunks
//! 2. nothing qualifies but the query mentions a recall trigger → project chunks
//! 3. still nothing → first `top_k` chunks

pub mod lexical;
pub mod tfidf;

use askfolio_config::{AppConfig, ScoringStrategy};
use askfolio_core::{Chunk, ChunkSource, ScoredChunk};
use thiserror::Error;
use tracing::{debug, warn};

pub use lexical::LexicalStrategy;
pub use tfidf::TfIdfStrategy;

/// Failures internal to a scoring strategy. Never surfaced to callers.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("vocabulary is empty after tokenization")]
    EmptyVocabulary,

    #[error("no strategy produced a ranking: {0}")]
    Exhausted(String),
}

/// A way of ranking chunks against a query.
///
/// Implementations return at most `top_k` results, highest score first,
/// with ties kept in chunk order. Only qualifying chunks are returned;
/// an empty result is valid and triggers the fallback policy in [`Scorer`].
pub trait RelevanceStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn rank(
        &self,
        query: &str,
        chunks: &[Chunk],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RetrievalError>;
}

/// Build the strategy selected in configuration.
pub fn strategy_for(kind: ScoringStrategy, config: &AppConfig) -> Box<dyn RelevanceStrategy> {
    match kind {
        ScoringStrategy::Tfidf => Box::new(TfIdfStrategy::new(
            config.retrieval.max_features,
            config.retrieval.min_similarity,
        )),
        ScoringStrategy::Lexical => Box::new(LexicalStrategy::new(config.retrieval.phrase_bonus)),
    }
}

/// Strategy plus fallback policy.
pub struct Scorer {
    primary: Box<dyn RelevanceStrategy>,
    secondary: Option<Box<dyn RelevanceStrategy>>,
    recall_triggers: Vec<String>,
}

impl Scorer {
    pub fn new(primary: Box<dyn RelevanceStrategy>) -> Self {
        Self {
            primary,
            secondary: None,
            recall_triggers: default_triggers(),
        }
    }

    pub fn with_secondary(mut self, secondary: Box<dyn RelevanceStrategy>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn with_recall_triggers(mut self, triggers: Vec<String>) -> Self {
        self.recall_triggers = triggers
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mut scorer = Self::new(strategy_for(config.retrieval.strategy, config))
            .with_recall_triggers(config.retrieval.recall_triggers.clone());
        if let Some(kind) = config.retrieval.secondary_strategy {
            if kind != config.retrieval.strategy {
                scorer = scorer.with_secondary(strategy_for(kind, config));
            }
        }
        scorer
    }

    pub fn strategy_name(&self) -> &'static str {
        self.primary.name()
    }

    /// Rank `chunks` for `query`, applying the fallback policy.
    ///
    /// Never returns more than `min(top_k, chunks.len())` results, and
    /// returns an empty list only when `chunks` is empty or `top_k` is zero.
    pub fn score(&self, query: &str, chunks: &[Chunk], top_k: usize) -> Vec<ScoredChunk> {
        if chunks.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let ranked = match self.rank_with_fallback(query, chunks, top_k) {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!(error = %e, "Relevance scoring failed, using leading chunks");
                return leading(chunks, top_k);
            }
        };

        if !ranked.is_empty() {
            debug!(
                strategy = self.primary.name(),
                selected = ranked.len(),
                top_score = ranked[0].score,
                "Ranked chunks"
            );
            return ranked;
        }

        if self.mentions_trigger(query) {
            let projects: Vec<ScoredChunk> = chunks
                .iter()
                .enumerate()
                .filter(|(_, c)| c.source == ChunkSource::Projects)
                .take(top_k)
                .map(|(index, c)| unscored(index, c))
                .collect();
            if !projects.is_empty() {
                debug!(selected = projects.len(), "Recall boost selected project chunks");
                return projects;
            }
        }

        debug!("No chunk qualified, using leading chunks");
        leading(chunks, top_k)
    }

    fn rank_with_fallback(
        &self,
        query: &str,
        chunks: &[Chunk],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let primary_err = match self.primary.rank(query, chunks, top_k) {
            Ok(ranked) => return Ok(ranked),
            Err(e) => e,
        };

        let Some(secondary) = &self.secondary else {
            return Err(primary_err);
        };

        warn!(
            strategy = self.primary.name(),
            fallback = secondary.name(),
            error = %primary_err,
            "Primary strategy failed, trying secondary"
        );
        secondary
            .rank(query, chunks, top_k)
            .map_err(|e| RetrievalError::Exhausted(format!("{primary_err}; {e}")))
    }

    fn mentions_trigger(&self, query: &str) -> bool {
        let lowered = query.to_lowercase();
        self.recall_triggers.iter().any(|t| lowered.contains(t.as_str()))
    }
}

fn default_triggers() -> Vec<String> {
    ["project", "work", "build"].iter().map(|t| t.to_string()).collect()
}

fn unscored(index: usize, chunk: &Chunk) -> ScoredChunk {
    ScoredChunk {
        chunk: chunk.clone(),
        score: 0.0,
        index,
    }
}

fn leading(chunks: &[Chunk], top_k: usize) -> Vec<ScoredChunk> {
    chunks
        .iter()
        .take(top_k)
        .enumerate()
        .map(|(index, c)| unscored(index, c))
        .collect()
}

/// Stable descending sort then truncate. Shared by the strategies.
pub(crate) fn top_k_stable(mut scored: Vec<ScoredChunk>, top_k: usize) -> Vec<ScoredChunk> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    scored.truncate(top_k);
    scored
}
