//! Embedding Gateway: text in, fixed-dimension vectors out.
//!
//! Providers implement [`EmbedProvider`]. [`get_default_provider`] picks the
//! HTTP provider, or the deterministic [`FakeEmbedder`] when
//! `APP_USE_FAKE_EMBEDDINGS=1` is set (tests and offline development).
use std::sync::Arc;

use salesintel_core::config::OracleSettings;
use salesintel_core::traits::EmbedProvider;
use salesintel_core::Result;

pub mod fake;
pub mod gateway;
pub mod openai;

pub use fake::FakeEmbedder;
pub use gateway::EmbeddingGateway;
pub use openai::OpenAiEmbedder;

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn get_default_provider(oracle: &OracleSettings, dim: usize) -> Result<Arc<dyn EmbedProvider>> {
    if use_fake_embeddings() {
        tracing::info!(target: "embed", dim, "using fake embedder");
        return Ok(Arc::new(FakeEmbedder::new(dim)));
    }
    Ok(Arc::new(OpenAiEmbedder::from_settings(oracle, dim)?))
}
