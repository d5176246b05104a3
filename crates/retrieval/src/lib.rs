//! # askfolio Retrieval
//!
//! Everything between the knowledge file on disk and the ranked chunks the
//! pipeline grounds an answer on:
//!
//! - [`loader`]: fail-soft document loading with an mtime-checked cache
//! - [`chunker`]: document → ordered text chunks
//! - [`scorer`]: TF-IDF and lexical ranking behind one fallback policy
//!
//! Nothing in this crate returns an error to the pipeline. A missing file,
//! a broken file or a degenerate query all degrade to less (or no) context.

pub mod chunker;
pub mod loader;
pub mod scorer;
pub mod text;

pub use chunker::{Chunker, chunk};
pub use loader::{KnowledgeStore, load_document};
pub use scorer::{LexicalStrategy, RelevanceStrategy, RetrievalError, Scorer, TfIdfStrategy};
