use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::analysis::Tokenizer;

/// Per-document, per-field term counts.
///
/// Built by walking a tokenizer's output once. Keeps:
/// - the count of each term
/// - the total number of tokens emitted (duplicates count every time)
/// - the ordered token stream itself, which translation scoring walks
///
/// Built per (document, field) and never cached across documents.
///
/// # Examples
/// ```
/// use translation_reranker::DocumentStatistics;
/// let stats = DocumentStatistics::from_tokens(["a", "b", "a"]);
/// assert_eq!(stats.get_count("a"), 2);
/// assert_eq!(stats.total_tokens(), 3);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DocumentStatistics {
    #[serde(with = "indexmap::map::serde_seq")]
    counts: IndexMap<Box<str>, u64>,
    total_tokens: u64,
    tokens: Vec<Box<str>>,
}

impl DocumentStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an already tokenized stream.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stats = Self::new();
        for token in tokens {
            stats.add_token(token.as_ref());
        }
        stats
    }

    /// Tokenize `text` and count it.
    pub fn from_text<T>(text: &str, tokenizer: &T) -> Self
    where
        T: Tokenizer + ?Sized,
    {
        Self::from_tokens(tokenizer.tokenize(text))
    }

    #[inline]
    fn add_token(&mut self, token: &str) {
        match self.counts.get_mut(token) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(token.into(), 1);
            }
        }
        self.tokens.push(token.into());
        self.total_tokens += 1;
    }

    /// Occurrences of `word`, 0 when unseen
    #[inline]
    pub fn get_count(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }

    /// Number of tokens emitted, not number of distinct terms
    #[inline]
    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    /// p(word | document) = count / total, 0.0 for an empty document
    #[inline]
    pub fn density(&self, word: &str) -> f64 {
        if self.total_tokens == 0 {
            return 0.0;
        }
        self.get_count(word) as f64 / self.total_tokens as f64
    }

    /// Token stream in document order
    #[inline]
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.as_ref())
    }

    /// Number of distinct terms
    #[inline]
    pub fn term_num(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_tokens == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, &v)| (k.as_ref(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardTokenizer;

    #[test]
    fn counts_duplicates_per_occurrence() {
        let stats = DocumentStatistics::from_tokens(["a", "b", "a"]);
        assert_eq!(stats.get_count("a"), 2);
        assert_eq!(stats.get_count("b"), 1);
        assert_eq!(stats.get_count("zzz"), 0);
        assert_eq!(stats.total_tokens(), 3);
        assert_eq!(stats.term_num(), 2);
        assert_eq!(stats.tokens().collect::<Vec<_>>(), vec!["a", "b", "a"]);
    }

    #[test]
    fn total_equals_stream_length() {
        let stats = DocumentStatistics::from_tokens(["x", "x", "x", "y"]);
        let sum: u64 = stats.iter().map(|(_, c)| c).sum();
        assert_eq!(sum, stats.total_tokens());
        assert!((stats.density("x") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn empty_document_has_zero_density() {
        let stats = DocumentStatistics::from_text("  ...  ", &StandardTokenizer::new());
        assert!(stats.is_empty());
        assert_eq!(stats.density("a"), 0.0);
    }

    #[test]
    fn from_text_uses_tokenizer() {
        let stats = DocumentStatistics::from_text("Dog bites dog.", &StandardTokenizer::new());
        assert_eq!(stats.get_count("dog"), 2);
        assert_eq!(stats.total_tokens(), 3);
    }
}
