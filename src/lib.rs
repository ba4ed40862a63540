//! This crate reranks search results with a translation language model built
//! from word-embedding similarities.

pub mod analysis;
pub mod config;
pub mod corpus;
pub mod document;
pub mod embedding;
pub mod error;
pub mod matrix;
pub mod persist;
pub mod query;
pub mod rerank;
pub mod scorer;
pub mod trec;
pub mod utils;

/// Error type of every fallible operation in this crate.
///
/// `UnknownTerm` is the only recoverable kind: callers keep a candidate's
/// prior score and continue. Everything else aborts one unit of work (one
/// load, one build, one query/document pair).
pub use error::{RerankError, Result};

/// Term Vector
/// One embedding (a vocabulary term, or a negated/summed concept).
///
/// Provides:
/// - norm, dot product
/// - cosine similarity with a one-sided tolerance clamp
/// - negation and addition (the label is display only)
/// - hash-based approximate equality (always 0.0 or 1.0)
pub use embedding::vector::TermVector;

/// Embedding Space
/// Vocabulary of term vectors sharing one dimensionality.
///
/// Loaded from a word2vec-style text file (`<size> <dims>` header, then
/// `<term> <floats...>` lines) and read-only afterwards. Builds similarity
/// matrices under the full, threshold and top-k policies, in parallel with
/// a deterministic merge.
pub use embedding::space::EmbeddingSpace;

/// Matrix construction policy and options (progress interval, cancel flag)
pub use embedding::build::{BuildOptions, MatrixPolicy};

/// Locality-sensitive hashing
/// `LocalityHasher` is the pluggable capability; `SuperBitLsh` is the default
/// random-hyperplane implementation, deterministic for a given seed.
pub use embedding::lsh::{LocalityHasher, SuperBitLsh};

/// Similarity Matrix
/// Sparse symmetric term-to-term similarity store.
///
/// Unrecorded pairs read as 0.0. Each row also keeps its neighbours in
/// similarity order for `top_k`.
///
/// # Serialization
/// Supported. Only the rows are written; the ordered sets are rebuilt on load.
pub use matrix::SimilarityMatrix;

/// Structured Query
/// Parsed query text: negatable basic atoms and negatable phrases.
///
/// `dog ~cat "big house" ~"red car"` has two basic atoms (`cat` negated) and
/// two phrases (the second negated). Phrase vectors are the signed sum of
/// their atoms, negated again when the phrase is.
pub use query::{Phrase, QueryAtom, StructuredQuery};

/// Tokenizer collaborator and the default lowercase alphanumeric analyzer
pub use analysis::{StandardTokenizer, Tokenizer};

/// Document Statistics
/// Term counts, total token count and token stream of one document field.
pub use document::DocumentStatistics;

/// Corpus statistics
/// `CorpusStatistics` supplies collection frequencies and the corpus size;
/// `Corpus` computes both from the documents it is given.
/// `DocumentStore` fetches stored field text by document id.
pub use corpus::{store::DocumentStore, store::MemoryStore, Corpus, CorpusStatistics};

/// Document Scorer
/// Scores a document against a structured query with one of three models:
/// - `Translation`: translation mass only
/// - `BasicDirichlet`: Dirichlet-smoothed unigram probability
/// - `TranslationDirichlet`: translation mass, Dirichlet smoothed
///
/// `CalculationMode` selects how similarities are obtained (matrix lookup,
/// on-the-fly cosine, or hash equality).
pub use scorer::{CalculationMode, DocumentScorer, ScoringModel, ScoringParams};

/// Candidate-list reranking with prior-score fallback
pub use rerank::{Candidate, RerankSummary, Reranker};

/// Run settings (smoothing constants, tolerance, model, mode, field, LSH shape)
pub use config::{LshConfig, RerankConfig};
