use anyhow::{Context, Result};
use std::path::Path;

use salesintel_agent::{InsightKind, InsightSynthesizer, MetricSnapshot};
use salesintel_core::config::Settings;

use crate::wiring::{chat_client, open_vector_store};

pub fn read_snapshot(path: &Path) -> Result<MetricSnapshot> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a metrics snapshot", path.display()))
}

pub async fn insight(settings: &Settings, kind: &str, metrics: &Path, with_notes: bool) -> Result<()> {
    let kind: InsightKind = kind.parse()?;
    let snapshot = read_snapshot(metrics)?;
    let mut synthesizer = InsightSynthesizer::new(chat_client(settings)?);
    if with_notes {
        synthesizer = synthesizer.with_notes(open_vector_store(settings).await?, settings.vector.context_token_budget);
    }
    let insight = synthesizer.generate(kind, &snapshot).await?;
    println!("{}", serde_json::to_string_pretty(&insight)?);
    Ok(())
}
