//! # askfolio Core
//!
//! Domain types, traits, and error definitions for the askfolio profile
//! assistant. This crate has **no framework dependencies**: it defines the
//! model that retrieval, providers, the pipeline and the gateway all share.
//!
//! The one seam defined here is [`Provider`]; implementations live in
//! `askfolio-providers` and tests substitute scripted mocks.

pub mod error;
pub mod knowledge;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, FailureKind, ProviderError, Result, UpstreamFailure};
pub use knowledge::{Chunk, ChunkSource, KnowledgeDocument, ScoredChunk};
pub use message::{ChatRequest, ConversationTurn, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
