//! Builds the library components from loaded settings.
use anyhow::{Context, Result};
use std::sync::Arc;

use salesintel_core::config::{expand_path, Settings};
use salesintel_core::traits::{QueryExecutor, TextGenerator};
use salesintel_embed::{get_default_provider, EmbeddingGateway};
use salesintel_oracle::ChatClient;
use salesintel_query::SqliteExecutor;
use salesintel_vector::{LanceVectorStore, VectorStore};

pub async fn open_vector_store(settings: &Settings) -> Result<Arc<VectorStore>> {
    let vector = &settings.vector;
    let uri = expand_path(&vector.uri);
    if let Some(parent) = uri.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let repo = LanceVectorStore::open(&uri.to_string_lossy(), &vector.table, vector.dimension).await?;
    let provider = get_default_provider(&settings.oracle, vector.dimension)?;
    let gateway = EmbeddingGateway::new(provider, vector.dimension)?;
    Ok(Arc::new(VectorStore::new(Arc::new(repo), gateway, vector.clone())?))
}

pub fn chat_client(settings: &Settings) -> Result<Arc<dyn TextGenerator>> {
    Ok(Arc::new(ChatClient::from_settings(&settings.oracle)?))
}

pub fn open_executor(settings: &Settings) -> Result<Arc<dyn QueryExecutor>> {
    let path = expand_path(&settings.store.sqlite_path);
    let executor =
        SqliteExecutor::open(&path).with_context(|| format!("opening structured store {}", path.display()))?;
    Ok(Arc::new(executor))
}
