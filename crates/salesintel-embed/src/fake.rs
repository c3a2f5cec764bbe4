use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use salesintel_core::traits::EmbedProvider;
use salesintel_core::Result;

/// Length of the token prefix that is hashed, so that inflections
/// ("interest", "interested") land in the same bucket.
const STEM_LEN: usize = 5;

/// Deterministic bag-of-stems embedder.
///
/// Each lowercase alphanumeric token is truncated to a short stem, hashed
/// into one of `dim` buckets and counted; the vector is then L2-normalized.
/// Texts sharing words get a positive cosine similarity, unrelated texts
/// score near zero. Blank text yields the zero vector.
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("fake:xxhash-stems:d{dim}") }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        if self.dim == 0 {
            return v;
        }
        let lower = text.to_lowercase();
        for token in lower.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let stem: String = token.chars().take(STEM_LEN).collect();
            let mut hasher = XxHash64::with_seed(0);
            stem.hash(&mut hasher);
            let idx = (hasher.finish() as usize) % self.dim;
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl EmbedProvider for FakeEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
