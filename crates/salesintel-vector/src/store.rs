use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

use salesintel_core::config::VectorSettings;
use salesintel_core::tokens::TokenEstimator;
use salesintel_core::traits::VectorRepository;
use salesintel_core::types::{DocumentType, NewDocument, SearchResult, SourceRef, VectorDocument};
use salesintel_core::{Error, Result};
use salesintel_embed::EmbeddingGateway;

use crate::context::assemble;

/// Indexing, similarity search and RAG context assembly over a repository.
pub struct VectorStore {
    repo: Arc<dyn VectorRepository>,
    gateway: EmbeddingGateway,
    settings: VectorSettings,
    estimator: TokenEstimator,
    // Serializes delete-then-insert so one source never ends up with two documents.
    write_lock: Mutex<()>,
}

/// `1 - distance`, clamped to [0, 1]; anything non-finite scores 0.
pub fn similarity_from_distance(distance: f32) -> f32 {
    let s = 1.0 - distance;
    if s.is_finite() { s.clamp(0.0, 1.0) } else { 0.0 }
}

impl VectorStore {
    pub fn new(repo: Arc<dyn VectorRepository>, gateway: EmbeddingGateway, settings: VectorSettings) -> Result<Self> {
        if repo.dimension() != gateway.dimension() {
            return Err(Error::DimensionMismatch { expected: repo.dimension(), actual: gateway.dimension() });
        }
        if settings.dimension != repo.dimension() {
            return Err(Error::DimensionMismatch { expected: settings.dimension, actual: repo.dimension() });
        }
        let estimator = TokenEstimator::new(settings.chars_per_token);
        Ok(Self { repo, gateway, settings, estimator, write_lock: Mutex::new(()) })
    }

    pub fn settings(&self) -> &VectorSettings {
        &self.settings
    }

    pub fn repository(&self) -> &Arc<dyn VectorRepository> {
        &self.repo
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.settings.dimension {
            return Err(Error::DimensionMismatch { expected: self.settings.dimension, actual: embedding.len() });
        }
        Ok(())
    }

    fn build(&self, doc: NewDocument, embedding: Vec<f32>) -> Result<VectorDocument> {
        self.check_dimension(&embedding)?;
        let now = Utc::now();
        Ok(VectorDocument {
            id: uuid::Uuid::new_v4().to_string(),
            seq: 0,
            content: doc.content,
            document_type: doc.document_type,
            source: doc.source,
            embedding,
            metadata: doc.metadata,
            created_at: now,
            updated_at: now,
        })
    }

    /// Embed and persist one document.
    pub async fn index(
        &self,
        content: &str,
        document_type: DocumentType,
        source: SourceRef,
        metadata: Option<serde_json::Value>,
    ) -> Result<VectorDocument> {
        let embedding = self.gateway.embed(content).await?;
        let doc = self.build(NewDocument { content: content.to_string(), document_type, source, metadata }, embedding)?;
        let mut stored = self.repo.insert(vec![doc]).await?;
        stored.pop().ok_or_else(|| Error::Storage("repository returned no document".into()))
    }

    /// Replace whatever is stored for `source` with a single new document.
    /// The embedding is computed first, so a failing oracle leaves the old
    /// document in place.
    pub async fn reindex(
        &self,
        content: &str,
        document_type: DocumentType,
        source: SourceRef,
        metadata: Option<serde_json::Value>,
    ) -> Result<VectorDocument> {
        let embedding = self.gateway.embed(content).await?;
        let doc = self.build(NewDocument { content: content.to_string(), document_type, source, metadata }, embedding)?;
        let _guard = self.write_lock.lock().await;
        let removed = self.repo.delete_by_source(&doc.source).await?;
        tracing::debug!(target: "vector", source = %doc.source, removed, "reindexing source");
        let mut stored = self.repo.insert(vec![doc]).await?;
        stored.pop().ok_or_else(|| Error::Storage("repository returned no document".into()))
    }

    /// Embed all contents in one gateway call and persist them together.
    pub async fn index_batch(&self, docs: Vec<NewDocument>) -> Result<Vec<VectorDocument>> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        let texts: Vec<String> = docs.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.gateway.embed_batch(&texts).await?;
        let built = docs
            .into_iter()
            .zip(embeddings)
            .map(|(doc, embedding)| self.build(doc, embedding))
            .collect::<Result<Vec<_>>>()?;
        self.repo.insert(built).await
    }

    /// Documents whose similarity to `query` is strictly above `threshold`,
    /// best first, at most `limit`. Equal scores keep insertion order.
    pub async fn search(
        &self,
        query: &str,
        document_type: Option<DocumentType>,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self.gateway.embed(query).await?;
        if query_vec.iter().all(|x| *x == 0.0) {
            return Ok(Vec::new());
        }
        let fetch = limit.saturating_mul(self.settings.overfetch.max(1));
        let candidates = self.repo.nearest(&query_vec, document_type, fetch).await?;

        let mut scored: Vec<(i64, SearchResult)> = candidates
            .into_iter()
            .filter(|c| document_type.map_or(true, |t| c.document.document_type == t))
            .map(|c| {
                let similarity = similarity_from_distance(c.distance);
                let d = c.document;
                (d.seq, SearchResult { id: d.id, content: d.content, document_type: d.document_type, source: d.source, metadata: d.metadata, similarity })
            })
            .filter(|(_, r)| r.similarity > threshold)
            .collect();
        scored.sort_by(|(sa, a), (sb, b)| b.similarity.total_cmp(&a.similarity).then(sa.cmp(sb)));
        scored.truncate(limit);
        tracing::debug!(target: "vector", hits = scored.len(), limit, threshold, "search complete");
        Ok(scored.into_iter().map(|(_, r)| r).collect())
    }

    /// Search with the configured default limit and threshold.
    pub async fn search_default(&self, query: &str, document_type: Option<DocumentType>) -> Result<Vec<SearchResult>> {
        self.search(query, document_type, self.settings.default_limit, self.settings.default_threshold).await
    }

    /// Context block for a generation prompt, never above `token_budget`
    /// estimated tokens and never containing a partial document.
    pub async fn assemble_context(&self, query: &str, document_type: Option<DocumentType>, token_budget: usize) -> Result<String> {
        let results = self
            .search(query, document_type, self.settings.context_limit, self.settings.default_threshold)
            .await?;
        Ok(assemble(&results, token_budget, &self.estimator))
    }

    pub async fn delete_by_source(&self, source_table: &str, source_id: i64) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        self.repo.delete_by_source(&SourceRef::new(source_table, source_id)).await
    }

    pub async fn get_document(&self, id: &str) -> Result<Option<VectorDocument>> {
        self.repo.get(id).await
    }

    /// Re-embed and rewrite one document. `None` when the id is unknown.
    pub async fn update_document(&self, id: &str, content: &str) -> Result<Option<VectorDocument>> {
        let Some(mut doc) = self.repo.get(id).await? else {
            return Ok(None);
        };
        let embedding = self.gateway.embed(content).await?;
        self.check_dimension(&embedding)?;
        doc.content = content.to_string();
        doc.embedding = embedding;
        doc.updated_at = Utc::now();
        self.repo.replace(doc.clone()).await?;
        Ok(Some(doc))
    }

    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        self.repo.delete(id).await
    }

    pub async fn index_lead_notes(&self, lead_id: i64, notes: &str) -> Result<Option<VectorDocument>> {
        self.index_source_text(notes, DocumentType::LeadNote, SourceRef::new("leads", lead_id)).await
    }

    pub async fn index_customer_notes(&self, customer_id: i64, notes: &str) -> Result<Option<VectorDocument>> {
        self.index_source_text(notes, DocumentType::CustomerNote, SourceRef::new("customers", customer_id)).await
    }

    pub async fn index_campaign_content(&self, campaign_id: i64, content: &str, description: &str) -> Result<Option<VectorDocument>> {
        let full = format!("{description}\n\n{content}");
        self.index_source_text(full.trim(), DocumentType::CampaignContent, SourceRef::new("campaigns", campaign_id)).await
    }

    pub async fn index_sales_notes(&self, record_id: i64, notes: &str) -> Result<Option<VectorDocument>> {
        self.index_source_text(notes, DocumentType::SalesNote, SourceRef::new("sales_records", record_id)).await
    }

    async fn index_source_text(&self, text: &str, document_type: DocumentType, source: SourceRef) -> Result<Option<VectorDocument>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.reindex(text, document_type, source, None).await.map(Some)
    }
}
