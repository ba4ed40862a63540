pub mod store;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::analysis::Tokenizer;
use crate::document::DocumentStatistics;
use crate::error::{RerankError, Result};

/// Collection-wide term statistics, the background model for smoothing.
pub trait CorpusStatistics: Send + Sync {
    /// Occurrences of `term` across the whole collection, `None` if unseen.
    fn collection_frequency(&self, term: &str) -> Option<u64>;

    /// Tokens across the whole collection
    fn total_tokens(&self) -> u64;

    /// collection_frequency / total_tokens
    ///
    /// # Errors
    /// `UnknownTerm` when the term has no (or a zero) collection frequency,
    /// or the collection is empty. A zero density would put `log(0)` into
    /// the score.
    fn density(&self, term: &str) -> Result<f64> {
        let total = self.total_tokens();
        match self.collection_frequency(term) {
            Some(freq) if freq > 0 && total > 0 => Ok(freq as f64 / total as f64),
            _ => Err(RerankError::unknown_term(term)),
        }
    }
}

/// In-memory corpus statistics accumulated from documents.
///
/// The corpus size is always the sum of what was added, never a fixed
/// baseline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    /// term -> collection frequency
    #[serde(with = "indexmap::map::serde_seq")]
    term_counts: IndexMap<Box<str>, u64>,
    total_tokens: u64,
    doc_num: u64,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one document's token stream.
    pub fn add_document<T>(&mut self, tokens: &[T])
    where
        T: AsRef<str>,
    {
        self.doc_num += 1;
        for token in tokens {
            self.add_occurrences(token.as_ref(), 1);
        }
    }

    /// Tokenize `text` and add it as one document.
    pub fn add_text<T>(&mut self, text: &str, tokenizer: &T)
    where
        T: Tokenizer + ?Sized,
    {
        self.add_document(&tokenizer.tokenize(text));
    }

    /// Add counts that were already aggregated for one document.
    pub fn add_statistics(&mut self, stats: &DocumentStatistics) {
        self.doc_num += 1;
        for (term, count) in stats.iter() {
            self.add_occurrences(term, count);
        }
    }

    fn add_occurrences(&mut self, term: &str, count: u64) {
        match self.term_counts.get_mut(term) {
            Some(c) => *c += count,
            None => {
                self.term_counts.insert(term.into(), count);
            }
        }
        self.total_tokens += count;
    }

    /// Build directly from (term, collection frequency) pairs.
    pub fn from_frequencies<I, S>(frequencies: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        let mut corpus = Self::new();
        for (term, count) in frequencies {
            corpus.add_occurrences(term.as_ref(), count);
        }
        corpus
    }

    /// Number of documents added
    pub fn doc_num(&self) -> u64 {
        self.doc_num
    }

    /// Number of distinct terms
    pub fn term_num(&self) -> usize {
        self.term_counts.len()
    }
}

impl CorpusStatistics for Corpus {
    #[inline]
    fn collection_frequency(&self, term: &str) -> Option<u64> {
        self.term_counts.get(term).copied()
    }

    #[inline]
    fn total_tokens(&self) -> u64 {
        self.total_tokens
    }
}
