use std::sync::Arc;

use salesintel_core::traits::EmbedProvider;
use salesintel_core::{Error, Result};

/// Front door for every embedding call.
///
/// Normalizes input (newlines folded to spaces, trimmed), maps blank text to
/// the zero vector without calling the provider, and checks that every vector
/// coming back has the configured dimension. Provider failures propagate;
/// there is no silent zero-vector fallback.
#[derive(Clone)]
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbedProvider>,
    dimension: usize,
}

impl EmbeddingGateway {
    pub fn new(provider: Arc<dyn EmbedProvider>, dimension: usize) -> Result<Self> {
        if provider.dim() != dimension {
            return Err(Error::DimensionMismatch { expected: dimension, actual: provider.dim() });
        }
        Ok(Self { provider, dimension })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embedder_id(&self) -> &str {
        self.provider.embedder_id()
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        out.pop().ok_or_else(|| Error::Embedding("provider returned no vector".into()))
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let cleaned: Vec<String> = texts.iter().map(|t| clean(t)).collect();
        let mut out: Vec<Vec<f32>> = vec![Vec::new(); cleaned.len()];
        let mut pending = Vec::new();
        let mut pending_idx = Vec::new();
        for (i, text) in cleaned.into_iter().enumerate() {
            if text.is_empty() {
                out[i] = vec![0.0; self.dimension];
            } else {
                pending_idx.push(i);
                pending.push(text);
            }
        }
        if pending.is_empty() {
            return Ok(out);
        }

        tracing::debug!(target: "embed", count = pending.len(), provider = self.embedder_id(), "embedding batch");
        let vectors = self.provider.embed_batch(&pending).await?;
        if vectors.len() != pending.len() {
            return Err(Error::Embedding(format!(
                "provider returned {} vectors for {} inputs",
                vectors.len(),
                pending.len()
            )));
        }
        for (i, v) in pending_idx.into_iter().zip(vectors) {
            if v.len() != self.dimension {
                return Err(Error::DimensionMismatch { expected: self.dimension, actual: v.len() });
            }
            out[i] = v;
        }
        Ok(out)
    }
}

fn clean(text: &str) -> String {
    text.replace(['\r', '\n'], " ").trim().to_string()
}
