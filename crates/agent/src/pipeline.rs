//! RAG pipeline: one question in, one grounded answer out.
//!
//! # Flow
//!
//! 1. Validate the question (empty → caller error, nothing else runs)
//! 2. Check a provider is configured (missing key → configuration error)
//! 3. Load the knowledge document and chunk it
//! 4. Score chunks against the question and assemble the context
//! 5. Compose the conversation and send it through the orchestrator
//!
//! Retrieval runs on the blocking pool and never fails the request; the
//! worst case is an answer composed without context.

use std::sync::Arc;

use askfolio_config::AppConfig;
use askfolio_core::{ChatRequest, Chunk, Error, Result, ScoredChunk, Usage};
use askfolio_providers::{ChatOrchestrator, ModelConfig, orchestrator_from_config};
use askfolio_retrieval::{Chunker, KnowledgeStore, Scorer};
use tracing::{debug, info, warn};

use crate::context::{ConversationComposer, assemble};

/// The answer to one question.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    pub retries: u32,
    pub model: String,
    /// Number of chunks the answer was grounded on.
    pub context_chunks: usize,
    pub usage: Option<Usage>,
}

/// What retrieval selected for a query.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub total_chunks: usize,
    pub selected: Vec<ScoredChunk>,
    pub context: String,
}

/// Knowledge loading and ranking. Everything here is synchronous: file
/// reads and TF-IDF fitting.
pub struct Retriever {
    store: Arc<KnowledgeStore>,
    chunker: Chunker,
    scorer: Scorer,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<KnowledgeStore>, chunker: Chunker, scorer: Scorer, top_k: usize) -> Self {
        Self {
            store,
            chunker,
            scorer,
            top_k,
        }
    }

    /// Current chunk set derived from the knowledge document.
    pub fn chunks(&self) -> Vec<Chunk> {
        self.chunker.chunk(&self.store.document())
    }

    /// Load, chunk, score and assemble for `query`.
    pub fn retrieve(&self, query: &str) -> Retrieval {
        let chunks = self.chunks();
        let selected = self.scorer.score(query, &chunks, self.top_k);
        let context = assemble(&selected);
        debug!(
            total_chunks = chunks.len(),
            selected = selected.len(),
            context_chars = context.len(),
            "Retrieved context"
        );
        Retrieval {
            total_chunks: chunks.len(),
            selected,
            context,
        }
    }
}

pub struct RagPipeline {
    retriever: Arc<Retriever>,
    composer: ConversationComposer,
    orchestrator: Option<ChatOrchestrator>,
    /// Why `orchestrator` is absent, reported on each chat request.
    unavailable_reason: String,
    model: ModelConfig,
}

impl RagPipeline {
    /// Assemble a pipeline from its parts, with no provider attached.
    pub fn new(
        store: Arc<KnowledgeStore>,
        chunker: Chunker,
        scorer: Scorer,
        composer: ConversationComposer,
        model: ModelConfig,
        top_k: usize,
    ) -> Self {
        Self {
            retriever: Arc::new(Retriever::new(store, chunker, scorer, top_k)),
            composer,
            orchestrator: None,
            unavailable_reason: "No language model provider configured".into(),
            model,
        }
    }

    pub fn with_orchestrator(mut self, orchestrator: ChatOrchestrator) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    /// Build everything from configuration.
    ///
    /// A provider that cannot be built (usually a missing API key) does not
    /// fail construction; chat requests report it as a configuration error.
    pub fn from_config(config: &AppConfig) -> Self {
        let pipeline = Self::new(
            Arc::new(KnowledgeStore::from_config(config)),
            Chunker::from_config(config),
            Scorer::from_config(config),
            ConversationComposer::from_config(config),
            ModelConfig::from_settings(&config.provider),
            config.retrieval.top_k,
        );

        match orchestrator_from_config(config) {
            Ok(orchestrator) => pipeline.with_orchestrator(orchestrator),
            Err(e) => {
                warn!(error = %e, "Chat disabled until a provider is configured");
                Self {
                    unavailable_reason: e.to_string(),
                    ..pipeline
                }
            }
        }
    }

    pub fn store(&self) -> &Arc<KnowledgeStore> {
        &self.retriever.store
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    pub fn strategy(&self) -> &'static str {
        self.retriever.scorer.strategy_name()
    }

    pub fn is_configured(&self) -> bool {
        self.orchestrator.is_some()
    }

    pub fn orchestrator(&self) -> Option<&ChatOrchestrator> {
        self.orchestrator.as_ref()
    }

    /// Current chunk set. Blocks on disk I/O.
    pub fn chunks(&self) -> Vec<Chunk> {
        self.retriever.chunks()
    }

    /// Retrieval for `query` without a provider. Blocks on disk I/O.
    pub fn retrieve(&self, query: &str) -> Retrieval {
        self.retriever.retrieve(query)
    }

    /// Number of chunks, counted on the blocking pool.
    pub async fn chunk_count(&self) -> Result<usize> {
        self.off_executor(|retriever| retriever.chunks().len()).await
    }

    /// Run retrieval work on the blocking pool so file reads and scoring
    /// never stall the async workers.
    async fn off_executor<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Retriever) -> T + Send + 'static,
    {
        let retriever = Arc::clone(&self.retriever);
        tokio::task::spawn_blocking(move || work(&retriever))
            .await
            .map_err(|e| Error::Internal(format!("retrieval task failed: {e}")))
    }

    /// Answer one question.
    pub async fn answer(&self, request: &ChatRequest) -> Result<ChatReply> {
        let query = request.message.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("Message is required".into()));
        }

        let Some(orchestrator) = &self.orchestrator else {
            return Err(Error::Config {
                message: self.unavailable_reason.clone(),
            });
        };

        let owned_query = query.to_string();
        let retrieval = self
            .off_executor(move |retriever| retriever.retrieve(&owned_query))
            .await?;
        let messages = self
            .composer
            .compose(&retrieval.context, &request.history, query);

        info!(
            history = request.history.len(),
            context_chunks = retrieval.selected.len(),
            messages = messages.len(),
            "Answering question"
        );

        let completion = orchestrator.send(messages, &self.model).await?;

        Ok(ChatReply {
            response: completion.reply,
            retries: completion.retries,
            model: completion.model,
            context_chunks: retrieval.selected.len(),
            usage: completion.usage,
        })
    }
}
