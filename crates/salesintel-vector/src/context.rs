//! Greedy, token-budgeted assembly of retrieved documents into a prompt block.

use salesintel_core::tokens::TokenEstimator;
use salesintel_core::types::SearchResult;

pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Concatenate `results` in the given (similarity) order, each tagged with its
/// document type, while the running estimate stays within `token_budget`.
///
/// Stops at the first document that would not fit; documents are never cut.
/// The cost of each piece includes its tag and the separator before it.
pub fn assemble(results: &[SearchResult], token_budget: usize, estimator: &TokenEstimator) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut used = 0usize;
    for result in results {
        let piece = format!("[{}] {}", result.document_type, result.content);
        let separator = if parts.is_empty() { 0 } else { estimator.estimate(CONTEXT_SEPARATOR) };
        let cost = estimator.estimate(&piece) + separator;
        if used + cost > token_budget {
            break;
        }
        used += cost;
        parts.push(piece);
    }
    parts.join(CONTEXT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesintel_core::types::{DocumentType, SourceRef};

    fn hit(content: &str, similarity: f32) -> SearchResult {
        SearchResult {
            id: content.to_string(),
            content: content.to_string(),
            document_type: DocumentType::LeadNote,
            source: SourceRef::new("leads", 1),
            metadata: None,
            similarity,
        }
    }

    #[test]
    fn tags_and_joins_in_order() {
        let out = assemble(&[hit("first", 0.9), hit("second", 0.8)], 1000, &TokenEstimator::default());
        assert_eq!(out, "[lead_note] first\n\n---\n\n[lead_note] second");
    }

    #[test]
    fn stops_before_exceeding_and_never_splits() {
        let est = TokenEstimator::default();
        let results = vec![hit(&"a".repeat(40), 0.9), hit(&"b".repeat(400), 0.8), hit("c", 0.7)];
        let out = assemble(&results, 30, &est);
        assert!(out.contains(&"a".repeat(40)));
        assert!(!out.contains('b'));
        // greedy stop: the small third document is not pulled in after a miss
        assert!(!out.contains("[lead_note] c"));
        assert!(est.estimate(&out) <= 30);
    }

    #[test]
    fn zero_budget_yields_empty_context() {
        assert_eq!(assemble(&[hit("x", 0.9)], 0, &TokenEstimator::default()), "");
    }
}
