//! Embedding provider backed by an OpenAI-compatible `/embeddings` endpoint.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use salesintel_core::config::OracleSettings;
use salesintel_core::traits::EmbedProvider;
use salesintel_core::{Error, Result};

pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dim: usize,
    id: String,
}

impl OpenAiEmbedder {
    pub fn from_settings(oracle: &OracleSettings, dim: usize) -> Result<Self> {
        if oracle.api_key.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "oracle.api_key is required for the HTTP embedding provider (or set APP_USE_FAKE_EMBEDDINGS=1)".into(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(oracle.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: oracle.base_url.trim_end_matches('/').to_string(),
            api_key: oracle.api_key.clone(),
            model: oracle.embedding_model.clone(),
            dim,
            id: format!("openai:{}:d{}", oracle.embedding_model, dim),
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbedProvider for OpenAiEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbeddingRequest { model: &self.model, input: texts, dimensions: self.dim };
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(target: "embed", %status, body = %text, "embedding request rejected");
            return Err(Error::Embedding(format!("embedding endpoint returned {status}")));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("failed to parse embedding response: {e}")))?;
        parsed.data.sort_by_key(|item| item.index);
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}
