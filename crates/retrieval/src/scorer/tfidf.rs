//! TF-IDF vectors compared with cosine similarity.
//!
//! The vectorizer is fitted per call on the chunks plus the query, so the
//! query takes part in document frequencies just like a chunk does.

use std::collections::HashMap;

use askfolio_core::{Chunk, ScoredChunk};

use super::{RelevanceStrategy, RetrievalError, top_k_stable};
use crate::text::content_tokens;

/// Cosine similarity between two vectors. Returns 0.0 for mismatched
/// lengths, empty input, or a zero vector.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    dot / denom
}

#[derive(Debug, Clone)]
pub struct TfIdfStrategy {
    max_features: usize,
    min_similarity: f32,
}

impl Default for TfIdfStrategy {
    fn default() -> Self {
        Self::new(100, 0.05)
    }
}

impl TfIdfStrategy {
    pub fn new(max_features: usize, min_similarity: f32) -> Self {
        Self {
            max_features: max_features.max(1),
            min_similarity,
        }
    }
}

/// Fitted vocabulary with smoothed inverse document frequencies.
struct Vocabulary {
    index: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl Vocabulary {
    fn fit(docs: &[Vec<String>], max_features: usize) -> Result<Self, RetrievalError> {
        let mut frequency: HashMap<&str, usize> = HashMap::new();
        let mut doc_frequency: HashMap<&str, usize> = HashMap::new();

        for doc in docs {
            let mut seen: Vec<&str> = Vec::new();
            for token in doc {
                *frequency.entry(token.as_str()).or_insert(0) += 1;
                if !seen.contains(&token.as_str()) {
                    seen.push(token.as_str());
                    *doc_frequency.entry(token.as_str()).or_insert(0) += 1;
                }
            }
        }

        if frequency.is_empty() {
            return Err(RetrievalError::EmptyVocabulary);
        }

        let mut terms: Vec<(&str, usize)> = frequency.into_iter().collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        terms.truncate(max_features);

        let n = docs.len() as f64;
        let mut index = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (i, (term, _)) in terms.iter().enumerate() {
            let df = doc_frequency.get(term).copied().unwrap_or(0) as f64;
            index.insert(term.to_string(), i);
            idf.push(((1.0 + n) / (1.0 + df)).ln() + 1.0);
        }

        Ok(Self { index, idf })
    }

    /// Raw term counts weighted by IDF, L2-normalised.
    fn transform(&self, tokens: &[String]) -> Vec<f64> {
        let mut row = vec![0.0f64; self.idf.len()];
        for token in tokens {
            if let Some(&i) = self.index.get(token) {
                row[i] += 1.0;
            }
        }
        for (value, idf) in row.iter_mut().zip(&self.idf) {
            *value *= idf;
        }
        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|v| *v /= norm);
        }
        row
    }
}

impl RelevanceStrategy for TfIdfStrategy {
    fn name(&self) -> &'static str {
        "tfidf"
    }

    fn rank(
        &self,
        query: &str,
        chunks: &[Chunk],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let mut docs: Vec<Vec<String>> = chunks.iter().map(|c| content_tokens(&c.text)).collect();
        docs.push(content_tokens(query));

        let vocab = Vocabulary::fit(&docs, self.max_features)?;
        let query_row = vocab.transform(&docs[chunks.len()]);

        let scored: Vec<ScoredChunk> = chunks
            .iter()
            .zip(&docs)
            .enumerate()
            .map(|(index, (chunk, tokens))| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(&query_row, &vocab.transform(tokens)) as f32,
                index,
            })
            .collect();

        let mut ranked = top_k_stable(scored, top_k);
        ranked.retain(|s| s.score > self.min_similarity);
        Ok(ranked)
    }
}
