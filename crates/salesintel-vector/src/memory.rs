use async_trait::async_trait;
use tokio::sync::RwLock;

use salesintel_core::traits::VectorRepository;
use salesintel_core::types::{DocumentType, ScoredDocument, SourceRef, VectorDocument};
use salesintel_core::{Error, Result};

/// Brute-force in-process repository. Exact cosine distance over every row;
/// suitable for tests and small tools, not for large corpora.
pub struct MemoryVectorStore {
    dim: usize,
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    docs: Vec<VectorDocument>,
    last_seq: i64,
}

impl MemoryVectorStore {
    pub fn new(dim: usize) -> Self {
        Self { dim, inner: RwLock::new(Inner::default()) }
    }

    fn check_dimension(&self, len: usize) -> Result<()> {
        if len != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: len });
        }
        Ok(())
    }
}

/// `1 - cos(a, b)`. A zero vector on either side has no direction and is
/// treated as orthogonal (distance 1).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    1.0 - dot / (na * nb)
}

#[async_trait]
impl VectorRepository for MemoryVectorStore {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn insert(&self, mut docs: Vec<VectorDocument>) -> Result<Vec<VectorDocument>> {
        for doc in &docs {
            self.check_dimension(doc.embedding.len())?;
        }
        let mut inner = self.inner.write().await;
        for doc in &mut docs {
            inner.last_seq += 1;
            doc.seq = inner.last_seq;
            inner.docs.push(doc.clone());
        }
        Ok(docs)
    }

    async fn replace(&self, doc: VectorDocument) -> Result<()> {
        self.check_dimension(doc.embedding.len())?;
        let mut inner = self.inner.write().await;
        match inner.docs.iter_mut().find(|d| d.id == doc.id) {
            Some(slot) => *slot = doc,
            None => inner.docs.push(doc),
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<VectorDocument>> {
        Ok(self.inner.read().await.docs.iter().find(|d| d.id == id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.docs.len();
        inner.docs.retain(|d| d.id != id);
        Ok(inner.docs.len() != before)
    }

    async fn delete_by_source(&self, source: &SourceRef) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.docs.len();
        inner.docs.retain(|d| &d.source != source);
        Ok(before - inner.docs.len())
    }

    async fn count_by_source(&self, source: &SourceRef) -> Result<usize> {
        Ok(self.inner.read().await.docs.iter().filter(|d| &d.source == source).count())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.read().await.docs.len())
    }

    async fn nearest(&self, query: &[f32], document_type: Option<DocumentType>, limit: usize) -> Result<Vec<ScoredDocument>> {
        self.check_dimension(query.len())?;
        let inner = self.inner.read().await;
        let mut hits: Vec<ScoredDocument> = inner
            .docs
            .iter()
            .filter(|d| document_type.map_or(true, |t| d.document_type == t))
            .map(|d| ScoredDocument { distance: cosine_distance(query, &d.embedding), document: d.clone() })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.document.seq.cmp(&b.document.seq)));
        hits.truncate(limit);
        Ok(hits)
    }
}
