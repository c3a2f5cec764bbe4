//! Approximate token accounting for prompt budgets.
//!
//! The estimate is a character-count heuristic (about one token per four
//! characters for English text), not a tokenizer. Treat budgets built on it
//! as approximate.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenEstimator {
    chars_per_token: usize,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self { chars_per_token: 4 }
    }
}

impl TokenEstimator {
    /// `chars_per_token` of zero is treated as one.
    pub fn new(chars_per_token: usize) -> Self {
        Self { chars_per_token: chars_per_token.max(1) }
    }

    pub fn chars_per_token(&self) -> usize {
        self.chars_per_token
    }

    pub fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_partial_tokens_up() {
        let est = TokenEstimator::default();
        assert_eq!(est.estimate(""), 0);
        assert_eq!(est.estimate("abc"), 1);
        assert_eq!(est.estimate("abcd"), 1);
        assert_eq!(est.estimate("abcde"), 2);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let est = TokenEstimator::new(2);
        assert_eq!(est.estimate("héllo"), 3);
    }

    #[test]
    fn zero_ratio_is_clamped() {
        assert_eq!(TokenEstimator::new(0).estimate("abc"), 3);
    }
}
