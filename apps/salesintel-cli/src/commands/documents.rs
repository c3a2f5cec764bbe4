use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::Path;

use salesintel_core::config::Settings;
use salesintel_core::types::{DocumentType, NewDocument, SourceRef};

use crate::wiring::open_vector_store;

/// One line of an import file.
#[derive(Debug, Deserialize)]
pub struct ImportRecord {
    pub content: String,
    pub document_type: DocumentType,
    pub source_table: String,
    pub source_id: i64,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl From<ImportRecord> for NewDocument {
    fn from(r: ImportRecord) -> Self {
        NewDocument {
            content: r.content,
            document_type: r.document_type,
            source: SourceRef::new(r.source_table, r.source_id),
            metadata: r.metadata,
        }
    }
}

/// Parse a JSONL file, skipping blank lines and records with blank content.
pub fn read_records(path: &Path) -> Result<Vec<ImportRecord>> {
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut records = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ImportRecord =
            serde_json::from_str(&line).with_context(|| format!("{}:{}: invalid record", path.display(), n + 1))?;
        if !record.content.trim().is_empty() {
            records.push(record);
        }
    }
    Ok(records)
}

pub async fn index(
    settings: &Settings,
    doc_type: &str,
    source_table: &str,
    source_id: i64,
    metadata: Option<&str>,
    append: bool,
    content: &str,
) -> Result<()> {
    let document_type: DocumentType = doc_type.parse()?;
    let metadata = metadata.map(serde_json::from_str::<serde_json::Value>).transpose().context("--metadata must be JSON")?;
    let store = open_vector_store(settings).await?;
    let source = SourceRef::new(source_table, source_id);
    let doc = if append {
        store.index(content, document_type, source, metadata).await?
    } else {
        store.reindex(content, document_type, source, metadata).await?
    };
    println!("✅ Indexed {} for {} (id={})", doc.document_type, doc.source, doc.id);
    Ok(())
}

pub async fn import(settings: &Settings, path: &Path, batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        bail!("--batch-size must be positive");
    }
    let records = read_records(path)?;
    println!("📄 {} records in {}", records.len(), path.display());
    if records.is_empty() {
        return Ok(());
    }
    let store = open_vector_store(settings).await?;

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    let total = records.len();
    let mut pending: Vec<NewDocument> = records.into_iter().map(NewDocument::from).collect();
    let mut indexed = 0usize;
    while !pending.is_empty() {
        let rest = pending.split_off(batch_size.min(pending.len()));
        let batch = std::mem::replace(&mut pending, rest);
        for doc in &batch {
            store.delete_by_source(&doc.source.source_table, doc.source.source_id).await?;
        }
        indexed += store.index_batch(batch).await?.len();
        pb.set_position(indexed as u64);
        pb.set_message(format!("batch of up to {batch_size}"));
    }
    pb.finish_with_message("done");
    tracing::info!(path = %path.display(), indexed, total, batch_size, "import finished");
    println!("✅ Imported {indexed}/{total} documents");
    Ok(())
}

pub async fn delete(settings: &Settings, source: Option<(&str, i64)>, id: Option<&str>) -> Result<()> {
    let store = open_vector_store(settings).await?;
    match (source, id) {
        (Some((table, source_id)), None) => {
            let removed = store.delete_by_source(table, source_id).await?;
            tracing::info!(source_table = table, source_id, removed, "deleted documents by source");
            println!("🗑️  Removed {removed} document(s) for {table}:{source_id}");
        }
        (None, Some(id)) => {
            let removed = store.delete_document(id).await?;
            tracing::info!(id, removed, "deleted document by id");
            println!("{}", if removed { "🗑️  Removed 1 document" } else { "No document with that id" });
        }
        _ => bail!("pass either --source-table/--source-id or --id"),
    }
    Ok(())
}
