use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::info;

use crate::embedding::space::EmbeddingSpace;
use crate::embedding::vector::TermVector;
use crate::error::{RerankError, Result};
use crate::matrix::SimilarityMatrix;
use crate::utils::sort::top_k;

/// How to sparsify the similarity matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatrixPolicy {
    /// Every unordered pair, self-pairs included. O(V^2) memory.
    Full,
    /// Keep pairs with similarity >= the threshold
    Threshold(f64),
    /// Each term keeps its `k` most similar other terms.
    /// Rows may end up longer than `k` because other rows' picks land in them too.
    TopK(usize),
}

/// Knobs for matrix construction that never change its result.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Log progress every this many rows (0 disables)
    pub progress_interval: usize,
    /// Set to true from another thread to stop the build
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            progress_interval: 100,
            cancel: None,
        }
    }
}

impl BuildOptions {
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    #[inline]
    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

impl EmbeddingSpace {
    /// Build a similarity matrix under `policy`.
    ///
    /// Rows are computed in parallel and merged in vocabulary order, so the
    /// result does not depend on thread scheduling.
    pub fn build_matrix(&self, policy: MatrixPolicy, options: &BuildOptions) -> Result<SimilarityMatrix> {
        match policy {
            MatrixPolicy::Full => self.build_full_matrix(options),
            MatrixPolicy::Threshold(min_similarity) => self.build_threshold_matrix(min_similarity, options),
            MatrixPolicy::TopK(max_entries) => self.build_top_k_matrix(max_entries, options),
        }
    }

    /// All pairs `i <= j`, cosine similarity with tolerance 0.
    pub fn build_full_matrix(&self, options: &BuildOptions) -> Result<SimilarityMatrix> {
        let entries = self.entries();
        let rows = compute_rows(&entries, options, |i, vec_i| {
            entries[i..]
                .iter()
                .enumerate()
                .map(|(offset, (_, vec_j))| -> Result<(usize, f64)> {
                    Ok((i + offset, vec_i.cosine_similarity(vec_j, 0.0)?))
                })
                .collect()
        })?;
        Ok(merge_rows(&entries, rows))
    }

    /// Pairs `i <= j` whose similarity is at least `min_similarity`.
    pub fn build_threshold_matrix(&self, min_similarity: f64, options: &BuildOptions) -> Result<SimilarityMatrix> {
        let entries = self.entries();
        let rows = compute_rows(&entries, options, |i, vec_i| {
            let mut row = Vec::new();
            for (offset, (_, vec_j)) in entries[i..].iter().enumerate() {
                let sim = vec_i.cosine_similarity(vec_j, 0.0)?;
                if sim >= min_similarity {
                    row.push((i + offset, sim));
                }
            }
            Ok(row)
        })?;
        Ok(merge_rows(&entries, rows))
    }

    /// For each term, its `max_entries` most similar other terms.
    /// Ties are broken by term, lexicographically.
    pub fn build_top_k_matrix(&self, max_entries: usize, options: &BuildOptions) -> Result<SimilarityMatrix> {
        let entries = self.entries();
        let rows = compute_rows(&entries, options, |i, vec_i| {
            let mut candidates: Vec<(Candidate<'_>, f64)> = Vec::with_capacity(entries.len().saturating_sub(1));
            for (j, &(term_j, vec_j)) in entries.iter().enumerate() {
                if j == i {
                    continue;
                }
                candidates.push((Candidate { idx: j, term: term_j }, vec_i.cosine_similarity(vec_j, 0.0)?));
            }
            Ok(top_k(candidates, max_entries)
                .into_iter()
                .map(|(c, sim)| (c.idx, sim))
                .collect())
        })?;
        Ok(merge_rows(&entries, rows))
    }

    fn entries(&self) -> Vec<(&str, &TermVector)> {
        self.iter().collect()
    }
}

/// Column position plus the term used for tie-breaks.
struct Candidate<'a> {
    idx: usize,
    term: &'a str,
}

impl AsRef<str> for Candidate<'_> {
    fn as_ref(&self) -> &str {
        self.term
    }
}

fn compute_rows<F>(
    entries: &[(&str, &TermVector)],
    options: &BuildOptions,
    row_fn: F,
) -> Result<Vec<Vec<(usize, f64)>>>
where
    F: Fn(usize, &TermVector) -> Result<Vec<(usize, f64)>> + Sync,
{
    let total = entries.len();
    let done = AtomicUsize::new(0);
    info!(terms = total, "building similarity matrix");

    let rows = entries
        .par_iter()
        .enumerate()
        .map(|(i, (_, vec_i))| {
            if options.is_cancelled() {
                return Err(RerankError::Cancelled);
            }
            let row = row_fn(i, vec_i)?;
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            if options.progress_interval > 0 && finished % options.progress_interval == 0 {
                info!(
                    rows = finished,
                    total,
                    percent = finished as f64 / total as f64 * 100.0,
                    "similarity matrix progress"
                );
            }
            Ok(row)
        })
        .collect::<Result<Vec<_>>>()?;

    info!(terms = total, "similarity matrix rows computed");
    Ok(rows)
}

/// Sequential merge in vocabulary order.
fn merge_rows(entries: &[(&str, &TermVector)], rows: Vec<Vec<(usize, f64)>>) -> SimilarityMatrix {
    let mut matrix = SimilarityMatrix::with_capacity(entries.len());
    for (term, _) in entries {
        matrix.init(term);
    }
    for ((term_i, _), row) in entries.iter().zip(rows) {
        for (j, sim) in row {
            matrix.put(term_i, entries[j].0, sim);
        }
    }
    matrix
}
