use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use salesintel_core::traits::EmbedProvider;
use salesintel_core::Error;
use salesintel_embed::{get_default_provider, EmbeddingGateway, FakeEmbedder};

/// Returns vectors of a fixed (possibly wrong) width and counts calls.
struct FixedWidth {
    reported: usize,
    actual: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl EmbedProvider for FixedWidth {
    fn embedder_id(&self) -> &str { "fixed" }
    fn dim(&self) -> usize { self.reported }
    async fn embed_batch(&self, texts: &[String]) -> salesintel_core::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|_| vec![0.5; self.actual]).collect())
    }
}

struct Failing;

#[async_trait]
impl EmbedProvider for Failing {
    fn embedder_id(&self) -> &str { "failing" }
    fn dim(&self) -> usize { 4 }
    async fn embed_batch(&self, _texts: &[String]) -> salesintel_core::Result<Vec<Vec<f32>>> {
        Err(Error::Embedding("oracle unreachable".into()))
    }
}

#[tokio::test]
async fn blank_input_maps_to_zero_vector_without_provider_call() -> anyhow::Result<()> {
    let provider = Arc::new(FixedWidth { reported: 4, actual: 4, calls: AtomicUsize::new(0) });
    let gateway = EmbeddingGateway::new(provider.clone(), 4)?;
    let v = gateway.embed("  \n\n ").await?;
    assert_eq!(v, vec![0.0; 4]);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn batch_keeps_input_order_and_mixes_blank_entries() -> anyhow::Result<()> {
    let gateway = EmbeddingGateway::new(Arc::new(FakeEmbedder::new(32)), 32)?;
    let texts = vec!["alpha".to_string(), "".to_string(), "bravo".to_string()];
    let out = gateway.embed_batch(&texts).await?;
    assert_eq!(out.len(), 3);
    assert_eq!(out[1], vec![0.0; 32]);
    assert_eq!(out[0], FakeEmbedder::new(32).embed_text("alpha"));
    assert_eq!(out[2], FakeEmbedder::new(32).embed_text("bravo"));
    Ok(())
}

#[tokio::test]
async fn wrong_width_from_provider_is_a_hard_error() -> anyhow::Result<()> {
    let provider = Arc::new(FixedWidth { reported: 4, actual: 3, calls: AtomicUsize::new(0) });
    let gateway = EmbeddingGateway::new(provider, 4)?;
    let err = gateway.embed("premium tier").await.expect_err("mismatch");
    assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 3 }));
    Ok(())
}

#[tokio::test]
async fn provider_failure_propagates() -> anyhow::Result<()> {
    let gateway = EmbeddingGateway::new(Arc::new(Failing), 4)?;
    let err = gateway.embed("anything").await.expect_err("failure");
    assert!(matches!(err, Error::Embedding(_)));
    Ok(())
}

#[test]
fn gateway_refuses_provider_of_other_dimension() {
    let err = EmbeddingGateway::new(Arc::new(FakeEmbedder::new(8)), 16).err().expect("mismatch");
    assert!(matches!(err, Error::DimensionMismatch { expected: 16, actual: 8 }));
}

#[test]
fn fake_provider_selected_by_env() {
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");
    let provider = get_default_provider(&Default::default(), 1536).expect("provider");
    assert_eq!(provider.dim(), 1536);
    assert!(provider.embedder_id().starts_with("fake:"));
}
