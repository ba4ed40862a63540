use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::analysis::Tokenizer;
use crate::document::DocumentStatistics;
use crate::error::RerankError;
use crate::query::StructuredQuery;
use crate::scorer::{CalculationMode, DocumentScorer, ScoringModel};

/// One retrieved document waiting to be rescored.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub doc_id: String,
    /// prior score, overwritten on a successful rescore
    pub score: f64,
    /// text of the scored field
    pub text: String,
}

impl Candidate {
    pub fn new(doc_id: impl Into<String>, score: f64, text: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            score,
            text: text.into(),
        }
    }
}

/// What happened to a candidate list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RerankSummary {
    /// scores replaced
    pub rescored: usize,
    /// prior score kept because of an unknown term
    pub fallbacks: usize,
    /// prior score kept because of any other error
    pub failures: usize,
}

impl RerankSummary {
    pub fn total(&self) -> usize {
        self.rescored + self.fallbacks + self.failures
    }
}

enum Outcome {
    Rescored,
    Fallback,
    Failed,
}

/// Rescores candidate lists with one scoring model.
///
/// Candidates keep their identity and order; only `score` changes. Sort
/// afterwards with [`sort_by_score`] if a new ranking is wanted.
pub struct Reranker<'a> {
    scorer: DocumentScorer<'a>,
    tokenizer: &'a dyn Tokenizer,
    model: ScoringModel,
    mode: CalculationMode,
}

impl<'a> Reranker<'a> {
    pub fn new(
        scorer: DocumentScorer<'a>,
        tokenizer: &'a dyn Tokenizer,
        model: ScoringModel,
        mode: CalculationMode,
    ) -> Self {
        Self {
            scorer,
            tokenizer,
            model,
            mode,
        }
    }

    pub fn scorer(&self) -> &DocumentScorer<'a> {
        &self.scorer
    }

    /// Parse `query_text` and rescore every candidate.
    ///
    /// A query that cannot be built leaves every prior score in place.
    pub fn rerank(&self, query_text: &str, candidates: &mut [Candidate]) -> RerankSummary {
        match StructuredQuery::build(query_text, self.tokenizer, self.scorer.space()) {
            Ok(query) => self.rerank_query(&query, candidates),
            Err(e) if e.is_recoverable() => {
                debug!(query = query_text, error = %e, "query not resolvable, keeping prior scores");
                RerankSummary {
                    fallbacks: candidates.len(),
                    ..RerankSummary::default()
                }
            }
            Err(e) => {
                warn!(query = query_text, error = %e, "query failed, keeping prior scores");
                RerankSummary {
                    failures: candidates.len(),
                    ..RerankSummary::default()
                }
            }
        }
    }

    /// Rescore every candidate against an already built query, in parallel.
    pub fn rerank_query(&self, query: &StructuredQuery, candidates: &mut [Candidate]) -> RerankSummary {
        let outcomes: Vec<Outcome> = candidates
            .par_iter_mut()
            .map(|candidate| {
                let doc = DocumentStatistics::from_text(&candidate.text, self.tokenizer);
                match self.scorer.score(query, &doc, self.model, self.mode) {
                    Ok(score) => {
                        candidate.score = score;
                        Outcome::Rescored
                    }
                    Err(e) => log_fallback(&candidate.doc_id, &e),
                }
            })
            .collect();

        let mut summary = RerankSummary::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Rescored => summary.rescored += 1,
                Outcome::Fallback => summary.fallbacks += 1,
                Outcome::Failed => summary.failures += 1,
            }
        }
        info!(
            rescored = summary.rescored,
            fallbacks = summary.fallbacks,
            failures = summary.failures,
            "candidate list rescored"
        );
        summary
    }
}

fn log_fallback(doc_id: &str, e: &RerankError) -> Outcome {
    if e.is_recoverable() {
        debug!(doc_id, error = %e, "keeping prior score");
        Outcome::Fallback
    } else {
        warn!(doc_id, error = %e, "scoring failed, keeping prior score");
        Outcome::Failed
    }
}

/// Sort by descending score. NaN scores sink to the end.
pub fn sort_by_score(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => b.score.total_cmp(&a.score),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    });
}
