pub mod similarity;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::analysis::Tokenizer;
use crate::corpus::CorpusStatistics;
use crate::document::DocumentStatistics;
use crate::embedding::lsh::LocalityHasher;
use crate::embedding::space::EmbeddingSpace;
use crate::embedding::vector::TermVector;
use crate::error::{RerankError, Result};
use crate::matrix::SimilarityMatrix;
use crate::query::{Phrase, QueryAtom, StructuredQuery};

/// How an atom or phrase is compared with a document token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMode {
    /// Matrix lookup for plain atoms, cosine with tolerance for derived vectors
    #[default]
    Cosine,
    /// Matrix lookup for plain atoms, hash equality for derived vectors
    Hash,
    /// Hash equality for everything
    HashAll,
}

/// Scoring formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringModel {
    /// Translation mass without smoothing
    Translation,
    /// Dirichlet-smoothed unigram model over basic atoms only
    BasicDirichlet,
    /// Translation mass, Dirichlet smoothed
    #[default]
    TranslationDirichlet,
}

/// Smoothing constants and similarity cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringParams {
    /// Dirichlet prior weight
    pub mu: f64,
    /// query generation mixing constant
    pub alpha: f64,
    /// smoothing floor
    pub beta: f64,
    /// cosine values below this count as 0
    pub tolerance: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            mu: 2500.0,
            alpha: 0.7,
            beta: 0.0,
            tolerance: 0.55,
        }
    }
}

/// A query item scored as one unit.
#[derive(Debug, Clone, Copy)]
enum Item<'q> {
    Phrase(&'q Phrase),
    Atom(&'q QueryAtom),
}

/// Scores documents against structured queries.
///
/// Holds only shared, read-only collaborators. The document is a parameter
/// of every scoring call, so one scorer can serve many threads at once.
///
/// All formulas add `ln(alpha) * (#phrases + #basic atoms)` to the sum of
/// per-item log ratios. A query item without corpus statistics fails the
/// whole call with `UnknownTerm`; nothing partial is returned.
pub struct DocumentScorer<'a> {
    matrix: &'a SimilarityMatrix,
    space: &'a EmbeddingSpace,
    hasher: &'a dyn LocalityHasher,
    corpus: &'a dyn CorpusStatistics,
    params: ScoringParams,
}

impl<'a> DocumentScorer<'a> {
    pub fn new(
        matrix: &'a SimilarityMatrix,
        space: &'a EmbeddingSpace,
        hasher: &'a dyn LocalityHasher,
        corpus: &'a dyn CorpusStatistics,
        params: ScoringParams,
    ) -> Self {
        Self {
            matrix,
            space,
            hasher,
            corpus,
            params,
        }
    }

    pub fn params(&self) -> &ScoringParams {
        &self.params
    }

    pub fn space(&self) -> &'a EmbeddingSpace {
        self.space
    }

    /// Score `doc` against `query` with the chosen formula.
    pub fn score(
        &self,
        query: &StructuredQuery,
        doc: &DocumentStatistics,
        model: ScoringModel,
        mode: CalculationMode,
    ) -> Result<f64> {
        match model {
            ScoringModel::Translation => self.score_translation(query, doc, mode),
            ScoringModel::BasicDirichlet => self.score_basic_dirichlet(query, doc),
            ScoringModel::TranslationDirichlet => self.score_translation_dirichlet(query, doc, mode),
        }
    }

    /// Tokenize a field's text, then score it.
    pub fn score_text<T>(
        &self,
        query: &StructuredQuery,
        text: &str,
        tokenizer: &T,
        model: ScoringModel,
        mode: CalculationMode,
    ) -> Result<f64>
    where
        T: Tokenizer + ?Sized,
    {
        let doc = DocumentStatistics::from_text(text, tokenizer);
        self.score(query, &doc, model, mode)
    }

    /// Σ ln((sqrt(mass) + beta) / (alpha * density)) + correction
    pub fn score_translation(
        &self,
        query: &StructuredQuery,
        doc: &DocumentStatistics,
        mode: CalculationMode,
    ) -> Result<f64> {
        let ScoringParams { alpha, beta, .. } = self.params;
        let mut result = 0.0;
        for item in items(query) {
            let density = self.item_density(item)?;
            let mass = self.item_mass(item, doc, mode)?;
            result += ((mass.sqrt() + beta) / (alpha * density)).ln();
        }
        self.checked(result + self.correction(query))
    }

    /// Dirichlet-smoothed unigram probability for each basic atom; phrases
    /// are ignored apart from the correction term.
    pub fn score_basic_dirichlet(&self, query: &StructuredQuery, doc: &DocumentStatistics) -> Result<f64> {
        let ScoringParams { mu, alpha, beta, .. } = self.params;
        let doc_len = doc.total_tokens() as f64;
        let mut result = 0.0;
        for atom in &query.basic {
            let density = self.corpus.density(&atom.word)?;
            let probability = (doc.get_count(&atom.word) as f64 + mu * density) / (doc_len + mu);
            result += ((probability + beta) / (alpha * density)).ln();
        }
        self.checked(result + self.correction(query))
    }

    /// Translation mass smoothed as
    /// `(sqrt(mass * doc_len) + mu * density) / (doc_len + mu)`.
    pub fn score_translation_dirichlet(
        &self,
        query: &StructuredQuery,
        doc: &DocumentStatistics,
        mode: CalculationMode,
    ) -> Result<f64> {
        let ScoringParams { mu, alpha, beta, .. } = self.params;
        let doc_len = doc.total_tokens() as f64;
        let mut result = 0.0;
        for item in items(query) {
            let density = self.item_density(item)?;
            let mass = self.item_mass(item, doc, mode)?;
            let probability = ((mass * doc_len).sqrt() + mu * density) / (doc_len + mu);
            result += ((probability + beta) / (alpha * density)).ln();
        }
        self.checked(result + self.correction(query))
    }

    /// NaN never leaves the scorer. Infinite scores are legal.
    #[inline]
    fn checked(&self, score: f64) -> Result<f64> {
        if score.is_nan() {
            return Err(RerankError::InvalidScore(format!("NaN under {:?}", self.params)));
        }
        Ok(score)
    }

    /// ln(alpha) * (#phrases + #basic atoms)
    #[inline]
    fn correction(&self, query: &StructuredQuery) -> f64 {
        self.params.alpha.ln() * query.len() as f64
    }

    /// Corpus density of an atom, or the rarest member density of a phrase.
    fn item_density(&self, item: Item<'_>) -> Result<f64> {
        match item {
            Item::Atom(atom) => self.corpus.density(&atom.word),
            Item::Phrase(phrase) => self.phrase_density(phrase),
        }
    }

    /// min over member atoms
    pub fn phrase_density(&self, phrase: &Phrase) -> Result<f64> {
        let mut result = f64::MAX;
        for atom in &phrase.atoms {
            result = result.min(self.corpus.density(&atom.word)?);
        }
        Ok(result)
    }

    /// Σ over the document token stream (duplicates included) of
    /// similarity(item, token) * p(token | doc)
    fn item_mass(&self, item: Item<'_>, doc: &DocumentStatistics, mode: CalculationMode) -> Result<f64> {
        match item {
            Item::Atom(atom) => {
                let vector = atom.vector_or_lookup(self.space)?;
                self.translation_mass(doc, |token| self.atom_similarity(token, atom, &vector, mode))
            }
            Item::Phrase(phrase) => {
                let vector: Cow<'_, TermVector> = phrase.vector_or_compose(self.space)?;
                self.translation_mass(doc, |token| self.phrase_similarity(token, &vector, mode))
            }
        }
    }

    fn translation_mass<F>(&self, doc: &DocumentStatistics, mut similarity: F) -> Result<f64>
    where
        F: FnMut(&str) -> Result<f64>,
    {
        let mut mass = 0.0;
        for token in doc.tokens() {
            mass += similarity(token)? * doc.density(token);
        }
        Ok(mass)
    }
}

fn items(query: &StructuredQuery) -> impl Iterator<Item = Item<'_>> {
    query
        .phrases
        .iter()
        .map(Item::Phrase)
        .chain(query.basic.iter().map(Item::Atom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardTokenizer;
    use crate::corpus::Corpus;
    use crate::embedding::build::BuildOptions;
    use crate::embedding::lsh::SuperBitLsh;

    struct Fixture {
        space: EmbeddingSpace,
        matrix: SimilarityMatrix,
        lsh: SuperBitLsh,
        corpus: Corpus,
    }

    fn fixture() -> Fixture {
        let mut space = EmbeddingSpace::new(3);
        space.insert("a", vec![1.0, 0.0, 0.0]).unwrap();
        space.insert("b", vec![0.0, 1.0, 0.0]).unwrap();
        space.insert("c", vec![0.0, 0.0, 1.0]).unwrap();
        let matrix = space.build_full_matrix(&BuildOptions::default()).unwrap();
        let lsh = SuperBitLsh::new(2, 8, 3, 11).unwrap();
        // densities a: 0.5, b: 0.3, c: 0.2
        let corpus = Corpus::from_frequencies([("a", 5), ("b", 3), ("c", 2)]);
        Fixture { space, matrix, lsh, corpus }
    }

    fn params() -> ScoringParams {
        ScoringParams {
            mu: 1.0,
            alpha: 0.5,
            beta: 0.01,
            tolerance: 0.0,
        }
    }

    fn query(text: &str, f: &Fixture) -> StructuredQuery {
        StructuredQuery::build(text, &StandardTokenizer::new(), &f.space).unwrap()
    }

    #[test]
    fn basic_dirichlet_matches_closed_form() {
        let f = fixture();
        let scorer = DocumentScorer::new(&f.matrix, &f.space, &f.lsh, &f.corpus, params());
        let doc = DocumentStatistics::from_tokens(["a", "x"]);
        let score = scorer
            .score(&query("a", &f), &doc, ScoringModel::BasicDirichlet, CalculationMode::Cosine)
            .unwrap();
        // p = (1 + 1 * 0.5) / (2 + 1) = 0.5
        let expected = ((0.5f64 + 0.01) / (0.5 * 0.5)).ln() + 0.5f64.ln();
        assert!((score - expected).abs() < 1e-12, "{score} != {expected}");
    }

    #[test]
    fn translation_dirichlet_matches_closed_form() {
        let f = fixture();
        let scorer = DocumentScorer::new(&f.matrix, &f.space, &f.lsh, &f.corpus, params());
        let doc = DocumentStatistics::from_tokens(["a", "x"]);
        let score = scorer
            .score(&query("a", &f), &doc, ScoringModel::TranslationDirichlet, CalculationMode::Cosine)
            .unwrap();
        // mass = sim(a,a) * 1/2 + 0 (x unknown) = 0.5
        let p = ((0.5f64 * 2.0).sqrt() + 0.5) / 3.0;
        let expected = ((p + 0.01) / (0.5 * 0.5)).ln() + 0.5f64.ln();
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn plain_translation_matches_closed_form() {
        let f = fixture();
        let scorer = DocumentScorer::new(&f.matrix, &f.space, &f.lsh, &f.corpus, params());
        let doc = DocumentStatistics::from_tokens(["a", "b", "a", "c"]);
        let score = scorer
            .score(&query("b", &f), &doc, ScoringModel::Translation, CalculationMode::Cosine)
            .unwrap();
        // only the b token matches: mass = 1 * 1/4
        let expected = ((0.25f64.sqrt() + 0.01) / (0.5 * 0.3)).ln() + 0.5f64.ln();
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn duplicate_tokens_count_every_occurrence() {
        let f = fixture();
        let scorer = DocumentScorer::new(&f.matrix, &f.space, &f.lsh, &f.corpus, params());
        let doc = DocumentStatistics::from_tokens(["a", "a", "b"]);
        let q = query("a", &f);
        let mass = scorer.item_mass(Item::Atom(&q.basic[0]), &doc, CalculationMode::Cosine).unwrap();
        // each "a" token adds 1 * 2/3
        assert!((mass - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn phrase_density_is_the_rarest_member() {
        let f = fixture();
        let scorer = DocumentScorer::new(&f.matrix, &f.space, &f.lsh, &f.corpus, params());
        let q = query("\"a c\"", &f);
        assert!((scorer.phrase_density(&q.phrases[0]).unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn negated_phrase_scores_lower_under_cosine() {
        let f = fixture();
        let scorer = DocumentScorer::new(&f.matrix, &f.space, &f.lsh, &f.corpus, params());
        let doc = DocumentStatistics::from_tokens(["a", "b"]);
        let plain = scorer
            .score(&query("\"a b\"", &f), &doc, ScoringModel::TranslationDirichlet, CalculationMode::Cosine)
            .unwrap();
        let negated = scorer
            .score(&query("~\"a b\"", &f), &doc, ScoringModel::TranslationDirichlet, CalculationMode::Cosine)
            .unwrap();
        assert!(plain > negated);
    }

    #[test]
    fn unknown_corpus_term_fails_the_whole_score() {
        let f = fixture();
        let corpus = Corpus::from_frequencies([("a", 5), ("b", 3)]);
        let scorer = DocumentScorer::new(&f.matrix, &f.space, &f.lsh, &corpus, params());
        let doc = DocumentStatistics::from_tokens(["a"]);
        for model in [ScoringModel::Translation, ScoringModel::BasicDirichlet, ScoringModel::TranslationDirichlet] {
            let err = scorer.score(&query("a c", &f), &doc, model, CalculationMode::Cosine).unwrap_err();
            assert!(err.is_recoverable());
            assert!(matches!(err, RerankError::UnknownTerm { ref term } if term == "c"));
        }
    }

    #[test]
    fn negative_mass_is_an_error_not_nan() {
        let f = fixture();
        let loose = ScoringParams {
            tolerance: -1.0,
            ..params()
        };
        let scorer = DocumentScorer::new(&f.matrix, &f.space, &f.lsh, &f.corpus, loose);
        // ~a against "a a": cosine -1 per token, mass -2
        let doc = DocumentStatistics::from_tokens(["a", "a"]);
        for model in [ScoringModel::Translation, ScoringModel::TranslationDirichlet] {
            let err = scorer.score(&query("~a", &f), &doc, model, CalculationMode::Cosine).unwrap_err();
            assert!(matches!(err, RerankError::InvalidScore(_)));
            assert!(!err.is_recoverable());
        }
    }

    #[test]
    fn zero_mu_on_empty_document_is_an_error() {
        let f = fixture();
        let scorer = DocumentScorer::new(
            &f.matrix,
            &f.space,
            &f.lsh,
            &f.corpus,
            ScoringParams { mu: 0.0, ..params() },
        );
        let empty = DocumentStatistics::new();
        let err = scorer
            .score(&query("a", &f), &empty, ScoringModel::BasicDirichlet, CalculationMode::Cosine)
            .unwrap_err();
        assert!(matches!(err, RerankError::InvalidScore(_)));
    }

    #[test]
    fn score_text_tokenizes_like_from_text() {
        let f = fixture();
        let scorer = DocumentScorer::new(&f.matrix, &f.space, &f.lsh, &f.corpus, params());
        let tokenizer = StandardTokenizer::new();
        let q = query("a ~b", &f);
        let via_text = scorer
            .score_text(&q, "A, b; zz", &tokenizer, ScoringModel::TranslationDirichlet, CalculationMode::Hash)
            .unwrap();
        let doc = DocumentStatistics::from_text("A, b; zz", &tokenizer);
        let via_stats = scorer
            .score(&q, &doc, ScoringModel::TranslationDirichlet, CalculationMode::Hash)
            .unwrap();
        assert_eq!(via_text, via_stats);
    }
}
