use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatTurn, DocumentType, Row, ScoredDocument, SourceRef, VectorDocument};

/// Remote or local model turning text into fixed-length vectors.
#[async_trait]
pub trait EmbedProvider: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `openai:text-embedding-3-small:d1536`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// A single call to the text-generation oracle.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the oracle for a strict JSON object.
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatTurn>, temperature: f32, max_tokens: u32) -> Self {
        Self { messages, temperature, max_tokens, json_mode: false }
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// Persistence path for embedded documents.
#[async_trait]
pub trait VectorRepository: Send + Sync {
    fn dimension(&self) -> usize;
    /// Persist new documents, assigning each a fresh `seq`.
    async fn insert(&self, docs: Vec<VectorDocument>) -> Result<Vec<VectorDocument>>;
    /// Overwrite an existing document in place, keeping its `seq`.
    async fn replace(&self, doc: VectorDocument) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<VectorDocument>>;
    async fn delete(&self, id: &str) -> Result<bool>;
    async fn delete_by_source(&self, source: &SourceRef) -> Result<usize>;
    async fn count_by_source(&self, source: &SourceRef) -> Result<usize>;
    async fn count(&self) -> Result<usize>;
    /// Closest documents by cosine distance, nearest first.
    async fn nearest(
        &self,
        query: &[f32],
        document_type: Option<DocumentType>,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>>;
}

/// Read path of the structured store. Implementations must run on a
/// connection that refuses writes.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run `query` and return at most `max_rows` rows; the rest of the
    /// result set is never materialized.
    async fn fetch_rows(&self, query: &str, max_rows: usize) -> Result<Vec<Row>>;
}
