use std::sync::Arc;

use salesintel_core::schema::SchemaDescription;
use salesintel_core::traits::{CompletionRequest, TextGenerator};
use salesintel_core::types::ChatTurn;
use salesintel_core::{Error, Result};
use salesintel_oracle::strip_code_fence;

/// Emitted by the oracle when the schema cannot answer the question.
/// It is itself a valid read-only query.
pub const CANNOT_ANSWER: &str = "SELECT 'Cannot answer this question' as message";

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 500;

/// NL-to-Query Translator: question plus recent turns in, one candidate
/// query out. The candidate is untrusted until validated.
pub struct Translator {
    oracle: Arc<dyn TextGenerator>,
    schema: SchemaDescription,
    max_turns: usize,
    row_cap: usize,
    dialect: String,
}

impl Translator {
    pub fn new(oracle: Arc<dyn TextGenerator>, schema: SchemaDescription, max_turns: usize, row_cap: usize) -> Self {
        Self { oracle, schema, max_turns, row_cap, dialect: "SQLite".to_string() }
    }

    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = dialect.into();
        self
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are a SQL expert assistant. Convert natural language questions into {dialect} queries.\n\n\
             {schema}\n\
             Rules:\n\
             1. ONLY generate SELECT queries - no INSERT, UPDATE, DELETE, DROP, or any data modification\n\
             2. Always use table aliases for clarity\n\
             3. Include relevant JOINs when needed\n\
             4. Use appropriate aggregations (COUNT, SUM, AVG) for summary questions\n\
             5. Format currency values and percentages appropriately\n\
             6. Limit results to {cap} rows maximum\n\
             7. Return ONLY the SQL query, nothing else: one statement, no comments, no semicolon\n\n\
             If the question cannot be answered with the available schema, return: {sentinel}",
            dialect = self.dialect,
            schema = self.schema.render(),
            cap = self.row_cap,
            sentinel = CANNOT_ANSWER,
        )
    }

    /// System prompt, then at most `max_turns` most recent turns, then the question.
    pub fn build_request(&self, message: &str, history: &[ChatTurn]) -> CompletionRequest {
        let recent = &history[history.len().saturating_sub(self.max_turns)..];
        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(ChatTurn::system(self.system_prompt()));
        messages.extend(recent.iter().cloned());
        messages.push(ChatTurn::user(format!("Convert this to SQL: {message}")));
        CompletionRequest::new(messages, TEMPERATURE, MAX_TOKENS)
    }

    /// One oracle call, no retry. Any failure comes back as
    /// [`Error::Translation`] carrying the original message.
    pub async fn translate(&self, message: &str, history: &[ChatTurn]) -> Result<String> {
        let raw = self.oracle.complete(self.build_request(message, history)).await.map_err(|e| {
            tracing::warn!(target: "query", error = %e, kind = e.kind(), "translation call failed");
            Error::Translation { message: message.to_string(), reason: e.kind().to_string() }
        })?;
        let candidate = clean_candidate(&raw);
        if candidate.is_empty() {
            return Err(Error::Translation { message: message.to_string(), reason: "empty".to_string() });
        }
        tracing::debug!(target: "query", chars = candidate.len(), "translated question");
        Ok(candidate)
    }
}

/// Strip code fences, outer whitespace and one trailing statement terminator.
pub fn clean_candidate(raw: &str) -> String {
    let s = strip_code_fence(raw);
    s.strip_suffix(';').unwrap_or(s).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_fences_and_terminator() {
        assert_eq!(clean_candidate("```sql\nSELECT COUNT(*) FROM leads l;\n```"), "SELECT COUNT(*) FROM leads l");
        assert_eq!(clean_candidate("  SELECT 1  "), "SELECT 1");
        assert_eq!(clean_candidate("```SELECT COUNT(*) FROM leads l```"), "SELECT COUNT(*) FROM leads l");
        assert_eq!(clean_candidate("```\nSELECT 1;\n```"), "SELECT 1");
        assert_eq!(clean_candidate("SELECT 1; DROP TABLE leads"), "SELECT 1; DROP TABLE leads");
    }
}
