//! Grounding context assembly.
//!
//! Deterministic: identical inputs always produce identical output. An
//! empty selection produces an empty string, which the composer treats as
//! "no grounding context".

use askfolio_core::ScoredChunk;

/// Separator between chunk texts in the assembled context.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Join selected chunk texts in ranked order.
pub fn assemble(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(ScoredChunk::text)
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}
