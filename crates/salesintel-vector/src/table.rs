//! LanceDB connection helpers and Arrow conversion for document rows.
//!
//! Provides the open/ensure helpers, the two directions of
//! `VectorDocument <-> RecordBatch`, and SQL filter builders for the
//! predicates the store pushes down to Lance.
use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::{DateTime, Utc};
use lancedb::{connect, Connection};
use std::sync::Arc;

use salesintel_core::types::{DocumentType, SourceRef, VectorDocument};
use salesintel_core::{Error, Result};

use crate::schema::{build_documents_schema, VECTOR_COLUMN};

pub(crate) fn storage<E: std::fmt::Display>(e: E) -> Error {
    Error::Storage(e.to_string())
}

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri).execute().await.map_err(storage)
}

pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<()> {
    let names = conn.table_names().execute().await.map_err(storage)?;
    if names.contains(&name.to_string()) {
        return Ok(());
    }
    // create empty table with 0 rows
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
    conn.create_table(name, Box::new(iter)).execute().await.map_err(storage)?;
    Ok(())
}

pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub fn id_filter(id: &str) -> String {
    format!("id = {}", quote(id))
}

pub fn source_filter(source: &SourceRef) -> String {
    format!("source_table = {} AND source_id = {}", quote(&source.source_table), source.source_id)
}

pub fn type_filter(document_type: DocumentType) -> String {
    format!("document_type = {}", quote(document_type.as_str()))
}

pub fn docs_to_record_batch(docs: &[VectorDocument], dim: i32) -> Result<RecordBatch> {
    let schema = build_documents_schema(dim);
    let mut ids = Vec::new(); let mut seqs = Vec::new(); let mut contents = Vec::new(); let mut types = Vec::new();
    let mut source_ids = Vec::new(); let mut source_tables = Vec::new(); let mut metadata: Vec<Option<String>> = Vec::new();
    let mut created = Vec::new(); let mut updated = Vec::new(); let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
    for doc in docs {
        ids.push(doc.id.clone());
        seqs.push(doc.seq);
        contents.push(doc.content.clone());
        types.push(doc.document_type.as_str().to_string());
        source_ids.push(doc.source.source_id);
        source_tables.push(doc.source.source_table.clone());
        metadata.push(doc.metadata.as_ref().map(|m| m.to_string()));
        created.push(doc.created_at.timestamp_millis());
        updated.push(doc.updated_at.timestamp_millis());
        vectors.push(Some(doc.embedding.iter().map(|&x| Some(x)).collect()));
    }
    let record_batch = RecordBatch::try_new(schema, vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(Int64Array::from(seqs)),
        Arc::new(StringArray::from(contents)),
        Arc::new(StringArray::from(types)),
        Arc::new(Int64Array::from(source_ids)),
        Arc::new(StringArray::from(source_tables)),
        Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors.into_iter(), dim)),
        Arc::new(StringArray::from(metadata)),
        Arc::new(TimestampMillisecondArray::from(created)),
        Arc::new(TimestampMillisecondArray::from(updated)),
    ]).map_err(storage)?;
    Ok(record_batch)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| Error::Storage(format!("column '{name}' missing or of unexpected type")))
}

fn timestamp(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| Error::Storage(format!("timestamp {ms} out of range")))
}

/// Decode every row of a batch. When the batch comes from a vector search the
/// `_distance` column is returned alongside each document.
pub fn batch_to_documents(batch: &RecordBatch) -> Result<Vec<(VectorDocument, Option<f32>)>> {
    let ids = column::<StringArray>(batch, "id")?;
    let seqs = column::<Int64Array>(batch, "seq")?;
    let contents = column::<StringArray>(batch, "content")?;
    let types = column::<StringArray>(batch, "document_type")?;
    let source_ids = column::<Int64Array>(batch, "source_id")?;
    let source_tables = column::<StringArray>(batch, "source_table")?;
    let vectors = column::<FixedSizeListArray>(batch, VECTOR_COLUMN)?;
    let metadata = column::<StringArray>(batch, "metadata")?;
    let created = column::<TimestampMillisecondArray>(batch, "created_at")?;
    let updated = column::<TimestampMillisecondArray>(batch, "updated_at")?;
    let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let document_type: DocumentType = types.value(i).parse().map_err(|_| Error::Storage(format!("unknown document_type '{}'", types.value(i))))?;
        let embedding = if vectors.is_null(i) { Vec::new() } else { vectors.value(i).as_primitive::<Float32Type>().values().to_vec() };
        let meta = if metadata.is_null(i) { None } else { Some(serde_json::from_str(metadata.value(i)).map_err(storage)?) };
        let doc = VectorDocument {
            id: ids.value(i).to_string(),
            seq: seqs.value(i),
            content: contents.value(i).to_string(),
            document_type,
            source: SourceRef::new(source_tables.value(i), source_ids.value(i)),
            embedding,
            metadata: meta,
            created_at: timestamp(created.value(i))?,
            updated_at: timestamp(updated.value(i))?,
        };
        out.push((doc, distances.map(|d| d.value(i))));
    }
    Ok(out)
}
