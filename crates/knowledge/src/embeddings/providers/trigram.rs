//! Offline embedding provider built from hashed character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use concierge_core::AppResult;
use std::collections::HashMap;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "an", "as", "are", "was", "were", "for", "to", "of", "in",
    "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had", "it",
    "its", "their", "they", "them", "what", "how", "does", "do", "can",
];

/// Deterministic, content-dependent embeddings with no model or network.
///
/// Texts that share words or word fragments land close together, which is
/// enough to exercise retrieval and thresholds in development and tests.
/// It is not semantic: synonyms do not match.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let lower = text.to_lowercase();
        let mut term_freq: HashMap<&str, u32> = HashMap::new();
        for token in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() > 1 && !STOP_WORDS.contains(t))
        {
            *term_freq.entry(token).or_insert(0) += 1;
        }

        for (token, freq) in &term_freq {
            let weight = (*freq as f32).sqrt();

            // Pad so that short tokens and word edges still produce trigrams.
            let padded: Vec<char> = std::iter::once('^')
                .chain(token.chars())
                .chain(std::iter::once('$'))
                .collect();
            for window in padded.windows(3) {
                let idx = self.bucket(window.iter().copied());
                embedding[idx] += weight;
            }

            let idx = self.bucket(token.chars());
            embedding[idx] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }

    /// FNV-1a over the chars, reduced to a dimension index.
    fn bucket(&self, chars: impl Iterator<Item = char>) -> usize {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for c in chars {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                hash ^= b as u64;
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
        }
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
