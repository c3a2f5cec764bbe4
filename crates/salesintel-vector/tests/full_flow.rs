use std::sync::Arc;

use salesintel_core::config::VectorSettings;
use salesintel_core::traits::VectorRepository;
use salesintel_core::types::{DocumentType, SourceRef};
use salesintel_core::Error;
use salesintel_embed::{EmbeddingGateway, FakeEmbedder};
use salesintel_vector::{LanceVectorStore, VectorStore};
use tempfile::TempDir;

const DIM: usize = 1536;
const TABLE: &str = "vector_documents_test_tmp";

async fn open_store(uri: &str) -> VectorStore {
    let repo = LanceVectorStore::open(uri, TABLE, DIM).await.expect("open lance");
    let gateway = EmbeddingGateway::new(Arc::new(FakeEmbedder::new(DIM)), DIM).expect("gateway");
    let settings = VectorSettings { dimension: DIM, ..VectorSettings::default() };
    VectorStore::new(Arc::new(repo), gateway, settings).expect("store")
}

#[tokio::test]
async fn lancedb_full_flow() {
    let tmp = TempDir::new().expect("tmp");
    let uri = tmp.path().to_string_lossy().to_string();
    let store = open_store(&uri).await;

    store.index_lead_notes(42, "Interested in premium tier").await.expect("lead 42");
    store.index_lead_notes(7, "Asked about onboarding timeline").await.expect("lead 7");
    store.index_customer_notes(3, "Renewal due, premium tier customer").await.expect("customer 3");
    store.index_sales_notes(9, "Closed a shipping contract").await.expect("sale 9");
    assert_eq!(store.repository().count().await.expect("count"), 4);

    let hits = store.search("premium interest", None, 5, 0.3).await.expect("search");
    eprintln!("Lance: 'premium interest' -> {} hits", hits.len());
    assert!(!hits.is_empty());
    assert_eq!(hits[0].source, SourceRef::new("leads", 42));
    for pair in hits.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }

    let customers = store.search("premium tier", Some(DocumentType::CustomerNote), 5, 0.1).await.expect("filtered");
    assert!(customers.iter().all(|h| h.document_type == DocumentType::CustomerNote));
    assert_eq!(customers.len(), 1);

    store.index_lead_notes(42, "Now asking for enterprise pricing").await.expect("reindex");
    let source = SourceRef::new("leads", 42);
    assert_eq!(store.repository().count_by_source(&source).await.expect("count"), 1);

    assert_eq!(store.delete_by_source("leads", 42).await.expect("delete"), 1);
    assert_eq!(store.repository().count_by_source(&source).await.expect("count"), 0);
    let hits = store.search("enterprise pricing", None, 5, 0.0).await.expect("search");
    assert!(hits.iter().all(|h| h.source != source));
}

#[tokio::test]
async fn reopen_continues_sequence_and_keeps_rows() {
    let tmp = TempDir::new().expect("tmp");
    let uri = tmp.path().to_string_lossy().to_string();
    let first = {
        let store = open_store(&uri).await;
        store.index_lead_notes(1, "premium tier").await.expect("index").expect("doc")
    };
    let store = open_store(&uri).await;
    let second = store.index_lead_notes(2, "premium tier").await.expect("index").expect("doc");
    assert!(second.seq > first.seq);

    let hits = store.search("premium tier", None, 5, 0.5).await.expect("search");
    let ids: Vec<i64> = hits.iter().map(|h| h.source.source_id).collect();
    assert_eq!(ids, vec![1, 2]);

    let fetched = store.get_document(&first.id).await.expect("get").expect("present");
    assert_eq!(fetched.content, "premium tier");
    assert_eq!(fetched.embedding.len(), DIM);
}

#[tokio::test]
async fn reopening_with_other_dimension_is_refused() {
    let tmp = TempDir::new().expect("tmp");
    let uri = tmp.path().to_string_lossy().to_string();
    LanceVectorStore::open(&uri, TABLE, DIM).await.expect("create");
    let err = LanceVectorStore::open(&uri, TABLE, 384).await.err().expect("mismatch");
    assert!(matches!(err, Error::DimensionMismatch { expected: 384, actual: DIM }));
}
