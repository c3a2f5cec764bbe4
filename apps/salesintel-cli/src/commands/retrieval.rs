use anyhow::Result;

use salesintel_core::config::Settings;
use salesintel_core::types::DocumentType;

use crate::wiring::open_vector_store;

fn parse_type(doc_type: Option<&str>) -> Result<Option<DocumentType>> {
    Ok(doc_type.map(str::parse).transpose()?)
}

pub async fn search(
    settings: &Settings,
    query: &str,
    doc_type: Option<&str>,
    limit: Option<usize>,
    threshold: Option<f32>,
) -> Result<()> {
    let document_type = parse_type(doc_type)?;
    let limit = limit.unwrap_or(settings.vector.default_limit);
    let threshold = threshold.unwrap_or(settings.vector.default_threshold);
    let store = open_vector_store(settings).await?;
    let results = store.search(query, document_type, limit, threshold).await?;

    println!("🔍 Found {} results for: \"{}\" (threshold {:.2})", results.len(), query, threshold);
    for (i, r) in results.iter().enumerate() {
        println!("\n  {}. similarity={:.4}  type={}  source={}  id={}", i + 1, r.similarity, r.document_type, r.source, r.id);
        println!("     📝 {}", r.content);
    }
    Ok(())
}

pub async fn context(settings: &Settings, query: &str, doc_type: Option<&str>, budget: Option<usize>) -> Result<()> {
    let document_type = parse_type(doc_type)?;
    let budget = budget.unwrap_or(settings.vector.context_token_budget);
    let store = open_vector_store(settings).await?;
    let block = store.assemble_context(query, document_type, budget).await?;
    if block.is_empty() {
        eprintln!("No documents above the similarity threshold fit in {budget} tokens.");
    } else {
        println!("{block}");
    }
    Ok(())
}
