//! Keyword overlap scoring.
//!
//! Needs no fitting step, so it is the usual choice for a secondary
//! strategy behind TF-IDF.

use askfolio_core::{Chunk, ScoredChunk};

use super::{RelevanceStrategy, RetrievalError, top_k_stable};
use crate::text::{content_tokens, tokenize};

#[derive(Debug, Clone)]
pub struct LexicalStrategy {
    phrase_bonus: u32,
}

impl Default for LexicalStrategy {
    fn default() -> Self {
        Self::new(2)
    }
}

impl LexicalStrategy {
    pub fn new(phrase_bonus: u32) -> Self {
        Self { phrase_bonus }
    }
}

/// De-duplicated query terms, stop words removed unless nothing else is left.
fn query_terms(query: &str) -> Vec<String> {
    let mut terms = content_tokens(query);
    if terms.is_empty() {
        terms = tokenize(query);
    }
    let mut unique: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        if !unique.contains(&term) {
            unique.push(term);
        }
    }
    unique
}

impl RelevanceStrategy for LexicalStrategy {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn rank(
        &self,
        query: &str,
        chunks: &[Chunk],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let terms = query_terms(query);
        let phrase = query.trim().to_lowercase();

        let scored: Vec<ScoredChunk> = chunks
            .iter()
            .enumerate()
            .filter_map(|(index, chunk)| {
                let text = chunk.text.to_lowercase();
                let mut score = terms.iter().filter(|t| text.contains(t.as_str())).count() as u32;
                if !phrase.is_empty() && text.contains(&phrase) {
                    score += self.phrase_bonus;
                }
                (score > 0).then(|| ScoredChunk {
                    chunk: chunk.clone(),
                    score: score as f32,
                    index,
                })
            })
            .collect();

        Ok(top_k_stable(scored, top_k))
    }
}
