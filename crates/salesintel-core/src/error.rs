use thiserror::Error;

/// Failures surfaced by the library crates.
///
/// Display strings of the variants that can reach an end user are generic:
/// they never carry raw oracle output, query text or internal identifiers.
/// Details live in the fields and are logged server-side.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    /// The text-generation oracle was unreachable or returned unusable output.
    #[error("text generation failed")]
    Oracle(String),

    /// The natural-language question could not be turned into a query.
    /// `message` is the original question so the caller can retry it.
    #[error("could not process the request, please try again")]
    Translation { message: String, reason: String },

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("query execution failed")]
    Execution(String),
}

impl Error {
    /// Short machine-readable tag, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "invalid_config",
            Error::NotFound(_) => "not_found",
            Error::Operation(_) => "operation",
            Error::Oracle(_) => "oracle",
            Error::Translation { .. } => "translation",
            Error::Embedding(_) => "embedding",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::Storage(_) => "storage",
            Error::Execution(_) => "execution",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_variants_do_not_leak_details() {
        let e = Error::Execution("SELECT secret FROM pg_shadow".into());
        assert_eq!(e.to_string(), "query execution failed");
        let e = Error::Translation { message: "how many leads".into(), reason: "timeout".into() };
        assert!(!e.to_string().contains("timeout"));
        let e = Error::Oracle("raw model output".into());
        assert!(!e.to_string().contains("raw"));
    }

    #[test]
    fn dimension_mismatch_names_both_sizes() {
        let e = Error::DimensionMismatch { expected: 1536, actual: 3 };
        assert_eq!(e.to_string(), "embedding dimension mismatch: expected 1536, got 3");
        assert_eq!(e.kind(), "dimension_mismatch");
    }
}
