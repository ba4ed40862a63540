pub mod serde;

use std::cmp::Ordering;
use std::collections::BTreeSet;

use indexmap::IndexMap;

/// One neighbour in a row's similarity-ordered set.
/// Ordered by similarity descending, then term ascending.
#[derive(Debug, Clone)]
struct RankedEntry {
    similarity: f64,
    term: Box<str>,
}

impl Ord for RankedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .similarity
            .total_cmp(&self.similarity)
            .then_with(|| self.term.cmp(&other.term))
    }
}

impl PartialOrd for RankedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedEntry {}

/// Sparse symmetric similarity store over a vocabulary.
///
/// Every `put` writes both directions, so `get(x, y) == get(y, x)` holds for
/// every recorded pair. A missing pair is not a computed zero, it was simply
/// never recorded; `get` reports it as 0.0 and `get_recorded` as `None`.
///
/// Each row also keeps its neighbours ordered by similarity for `top_k`.
#[derive(Debug, Clone, Default)]
pub struct SimilarityMatrix {
    rows: IndexMap<Box<str>, IndexMap<Box<str>, f64>>,
    ranked: IndexMap<Box<str>, BTreeSet<RankedEntry>>,
}

impl SimilarityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(terms: usize) -> Self {
        Self {
            rows: IndexMap::with_capacity(terms),
            ranked: IndexMap::with_capacity(terms),
        }
    }

    /// Make sure `term` has a (possibly empty) row. Idempotent.
    pub fn init(&mut self, term: &str) {
        if !self.rows.contains_key(term) {
            self.rows.insert(term.into(), IndexMap::new());
        }
        if !self.ranked.contains_key(term) {
            self.ranked.insert(term.into(), BTreeSet::new());
        }
    }

    /// Record `similarity` for the pair in both rows.
    /// `x == y` is allowed and fills a single cell.
    pub fn put(&mut self, x: &str, y: &str, similarity: f64) {
        self.put_directed(x, y, similarity);
        if x != y {
            self.put_directed(y, x, similarity);
        }
    }

    fn put_directed(&mut self, from: &str, to: &str, similarity: f64) {
        self.init(from);
        let previous = self
            .rows
            .get_mut(from)
            .and_then(|row| row.insert(to.into(), similarity));
        if let Some(ranked) = self.ranked.get_mut(from) {
            if let Some(old) = previous {
                ranked.remove(&RankedEntry { similarity: old, term: to.into() });
            }
            ranked.insert(RankedEntry { similarity, term: to.into() });
        }
    }

    /// Recorded similarity, or 0.0 when either side is unknown.
    #[inline]
    pub fn get(&self, x: &str, y: &str) -> f64 {
        self.get_recorded(x, y).unwrap_or(0.0)
    }

    #[inline]
    pub fn get_recorded(&self, x: &str, y: &str) -> Option<f64> {
        self.rows.get(x).and_then(|row| row.get(y)).copied()
    }

    /// The `k` most similar recorded neighbours of `term`, best first.
    /// Equal similarities come back in term order.
    pub fn top_k(&self, term: &str, k: usize) -> Vec<(&str, f64)> {
        self.ranked
            .get(term)
            .map(|set| {
                set.iter()
                    .take(k)
                    .map(|e| (e.term.as_ref(), e.similarity))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn row(&self, term: &str) -> Option<&IndexMap<Box<str>, f64>> {
        self.rows.get(term)
    }

    pub fn row_len(&self, term: &str) -> usize {
        self.rows.get(term).map_or(0, |row| row.len())
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.rows.contains_key(term)
    }

    /// Number of rows
    pub fn term_num(&self) -> usize {
        self.rows.len()
    }

    /// Number of directed cells across all rows
    pub fn entry_num(&self) -> usize {
        self.rows.values().map(|row| row.len()).sum()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(|k| k.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexMap<Box<str>, f64>)> {
        self.rows.iter().map(|(k, row)| (k.as_ref(), row))
    }

    /// Rebuild from plain rows, recreating the ordered sets.
    pub(crate) fn from_rows(rows: IndexMap<Box<str>, IndexMap<Box<str>, f64>>) -> Self {
        let ranked = rows
            .iter()
            .map(|(term, row)| {
                let set: BTreeSet<RankedEntry> = row
                    .iter()
                    .map(|(other, &similarity)| RankedEntry { similarity, term: other.clone() })
                    .collect();
                (term.clone(), set)
            })
            .collect();
        Self { rows, ranked }
    }
}

impl PartialEq for SimilarityMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}
