use arrow_array::cast::AsArray;
use arrow_array::types::Int64Type;
use arrow_array::RecordBatchIterator;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, DistanceType, Table};
use std::sync::atomic::{AtomicI64, Ordering};

use salesintel_core::traits::VectorRepository;
use salesintel_core::types::{DocumentType, ScoredDocument, SourceRef, VectorDocument};
use salesintel_core::{Error, Result};

use crate::schema::{build_documents_schema, vector_width};
use crate::table::{batch_to_documents, docs_to_record_batch, ensure_table, id_filter, open_db, source_filter, storage, type_filter};

/// LanceDB-backed document repository.
///
/// Nearest-neighbour queries use cosine distance. `seq` values are handed out
/// from a counter seeded with the table's current maximum on open; a single
/// writer process per table is assumed.
pub struct LanceVectorStore {
    db: Connection,
    table_name: String,
    dim: usize,
    next_seq: AtomicI64,
}

impl LanceVectorStore {
    /// Open (or create) `table_name` under `uri`. An existing table whose
    /// vector column has another width is refused.
    pub async fn open(uri: &str, table_name: &str, dim: usize) -> Result<Self> {
        let width = i32::try_from(dim).map_err(|_| Error::InvalidConfig(format!("dimension {dim} too large")))?;
        let db = open_db(uri).await?;
        ensure_table(&db, table_name, build_documents_schema(width)).await?;
        let table = db.open_table(table_name).execute().await.map_err(storage)?;
        let schema = table.schema().await.map_err(storage)?;
        match vector_width(&schema) {
            Some(actual) if actual == dim => {}
            Some(actual) => return Err(Error::DimensionMismatch { expected: dim, actual }),
            None => return Err(Error::Storage(format!("table '{table_name}' has no vector column"))),
        }
        let max_seq = max_seq(&table).await?;
        tracing::info!(target: "vector", uri, table = table_name, dim, max_seq, "opened lance table");
        Ok(Self { db, table_name: table_name.to_string(), dim, next_seq: AtomicI64::new(max_seq + 1) })
    }

    async fn table(&self) -> Result<Table> {
        self.db.open_table(&self.table_name).execute().await.map_err(storage)
    }

    fn check_dimension(&self, doc: &VectorDocument) -> Result<()> {
        if doc.embedding.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: doc.embedding.len() });
        }
        Ok(())
    }

    fn width(&self) -> i32 {
        // Checked to fit in `open`.
        self.dim as i32
    }

    async fn collect(&self, filter: String, limit: Option<usize>) -> Result<Vec<VectorDocument>> {
        let table = self.table().await?;
        let mut query = table.query().only_if(filter);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let mut stream = query.execute().await.map_err(storage)?;
        let mut docs = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(storage)? {
            docs.extend(batch_to_documents(&batch)?.into_iter().map(|(d, _)| d));
        }
        Ok(docs)
    }
}

async fn max_seq(table: &Table) -> Result<i64> {
    let mut max = 0i64;
    let mut stream = table.query().select(Select::columns(&["seq"])).execute().await.map_err(storage)?;
    while let Some(batch) = stream.try_next().await.map_err(storage)? {
        if let Some(col) = batch.column_by_name("seq") {
            if let Some(m) = col.as_primitive_opt::<Int64Type>().and_then(|a| a.values().iter().copied().max()) {
                max = max.max(m);
            }
        }
    }
    Ok(max)
}

#[async_trait]
impl VectorRepository for LanceVectorStore {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn insert(&self, mut docs: Vec<VectorDocument>) -> Result<Vec<VectorDocument>> {
        if docs.is_empty() {
            return Ok(docs);
        }
        for doc in &mut docs {
            self.check_dimension(doc)?;
            doc.seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        }
        let record_batch = docs_to_record_batch(&docs, self.width())?;
        let schema = record_batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
        self.table().await?.add(reader).execute().await.map_err(storage)?;
        tracing::debug!(target: "vector", count = docs.len(), table = %self.table_name, "inserted documents");
        Ok(docs)
    }

    async fn replace(&self, doc: VectorDocument) -> Result<()> {
        self.check_dimension(&doc)?;
        let record_batch = docs_to_record_batch(std::slice::from_ref(&doc), self.width())?;
        let schema = record_batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
        let table = self.table().await?;
        // Upsert behavior via merge_insert: id is unique
        let mut mi = table.merge_insert(&["id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await.map_err(storage)?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<VectorDocument>> {
        Ok(self.collect(id_filter(id), Some(1)).await?.into_iter().next())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let table = self.table().await?;
        let filter = id_filter(id);
        let found = table.count_rows(Some(filter.clone())).await.map_err(storage)?;
        if found == 0 {
            return Ok(false);
        }
        table.delete(&filter).await.map_err(storage)?;
        Ok(true)
    }

    async fn delete_by_source(&self, source: &SourceRef) -> Result<usize> {
        let table = self.table().await?;
        let filter = source_filter(source);
        let found = table.count_rows(Some(filter.clone())).await.map_err(storage)?;
        if found > 0 {
            table.delete(&filter).await.map_err(storage)?;
            tracing::debug!(target: "vector", %source, deleted = found, "deleted documents by source");
        }
        Ok(found)
    }

    async fn count_by_source(&self, source: &SourceRef) -> Result<usize> {
        self.table().await?.count_rows(Some(source_filter(source))).await.map_err(storage)
    }

    async fn count(&self) -> Result<usize> {
        self.table().await?.count_rows(None).await.map_err(storage)
    }

    async fn nearest(&self, query: &[f32], document_type: Option<DocumentType>, limit: usize) -> Result<Vec<ScoredDocument>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let table = self.table().await?;
        if limit == 0 || table.count_rows(None).await.map_err(storage)? == 0 {
            return Ok(Vec::new());
        }
        let mut search = table
            .vector_search(query.to_vec())
            .map_err(storage)?
            .distance_type(DistanceType::Cosine)
            .limit(limit);
        if let Some(t) = document_type {
            search = search.only_if(type_filter(t));
        }
        let mut stream = search.execute().await.map_err(storage)?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(storage)? {
            for (document, distance) in batch_to_documents(&batch)? {
                let distance = distance.ok_or_else(|| Error::Storage("vector search returned no _distance column".into()))?;
                hits.push(ScoredDocument { document, distance });
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.document.seq.cmp(&b.document.seq)));
        Ok(hits)
    }
}
