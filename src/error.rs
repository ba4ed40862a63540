use thiserror::Error;

/// Errors raised while loading, building, persisting or scoring.
///
/// Only [`RerankError::UnknownTerm`] is recoverable: the caller keeps the
/// candidate's prior score and moves on. Everything else aborts the current
/// unit of work (one load, one build, one query/document pair).
#[derive(Debug, Error)]
pub enum RerankError {
    /// A query word has no embedding or no corpus statistics.
    #[error("unknown term: {term}")]
    UnknownTerm {
        /// The word that could not be resolved
        term: String,
    },

    /// Two vectors of different dimensionality met in one operation.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality of the left operand (or of the space)
        expected: usize,
        /// Dimensionality actually seen
        actual: usize,
    },

    /// The embedding source (or another text input) violates its format.
    #[error("malformed source at line {line}: {reason}")]
    MalformedSource {
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// A persisted structure could not be written or read back.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Matrix construction was cancelled through its cancel flag.
    #[error("operation cancelled")]
    Cancelled,

    /// A scoring formula produced NaN (e.g. negative translation mass, or 0/0).
    #[error("invalid score: {0}")]
    InvalidScore(String),
}

impl RerankError {
    pub fn unknown_term(term: impl Into<String>) -> Self {
        RerankError::UnknownTerm { term: term.into() }
    }

    /// Whether the caller may fall back to the prior score and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RerankError::UnknownTerm { .. })
    }
}

impl From<serde_cbor::Error> for RerankError {
    fn from(e: serde_cbor::Error) -> Self {
        RerankError::PersistenceFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RerankError>;
