use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::embedding::vector::TermVector;
use crate::error::{RerankError, Result};

// header counts are untrusted
const MAX_PREALLOC: usize = 1 << 20;

/// Vocabulary of term embeddings sharing one dimensionality.
///
/// Built once (from a word2vec-style text file or by hand) and read-only
/// afterwards. Terms keep their load order, which makes matrix construction
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSpace {
    #[serde(with = "indexmap::map::serde_seq")]
    vectors: IndexMap<Box<str>, TermVector>,
    dimensions: usize,
}

impl EmbeddingSpace {
    /// Empty space with a fixed dimensionality
    pub fn new(dimensions: usize) -> Self {
        Self {
            vectors: IndexMap::new(),
            dimensions,
        }
    }

    /// Add (or replace) a term's vector.
    pub fn insert(&mut self, term: &str, components: Vec<f64>) -> Result<()> {
        if components.len() != self.dimensions {
            return Err(RerankError::DimensionMismatch {
                expected: self.dimensions,
                actual: components.len(),
            });
        }
        self.vectors
            .insert(term.into(), TermVector::new(term, components));
        Ok(())
    }

    /// Load from a text source.
    ///
    /// Line 1: `<vocab_size> <dimension_count>`
    /// Then one `<term> <float> x dimension_count` per line, space separated.
    /// Blank lines are skipped. A header count that disagrees with the
    /// number of entries is only logged; a wrong component count is fatal.
    pub fn load<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines().enumerate();

        let (declared_size, dimensions) = loop {
            let (idx, line) = match lines.next() {
                Some((idx, line)) => (idx, line?),
                None => {
                    return Err(RerankError::MalformedSource {
                        line: 1,
                        reason: "missing header".to_string(),
                    })
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            break parse_header(&line, idx + 1)?;
        };

        let mut space = Self {
            vectors: IndexMap::with_capacity(declared_size.min(MAX_PREALLOC)),
            dimensions,
        };

        for (idx, line) in lines {
            let line = line?;
            let line_no = idx + 1;
            let mut fields = line.split_whitespace();
            let term = match fields.next() {
                Some(term) => term,
                None => continue,
            };
            let components = fields
                .map(|f| {
                    f.parse::<f64>().map_err(|e| RerankError::MalformedSource {
                        line: line_no,
                        reason: format!("bad component {f:?} for {term:?}: {e}"),
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            if components.len() != dimensions {
                return Err(RerankError::MalformedSource {
                    line: line_no,
                    reason: format!(
                        "{term:?} has {} components, header says {dimensions}",
                        components.len()
                    ),
                });
            }
            if space.vectors.contains_key(term) {
                warn!(term, line = line_no, "duplicate term in embedding source, keeping the later vector");
            }
            space
                .vectors
                .insert(term.into(), TermVector::new(term, components));
        }

        if space.size() != declared_size {
            warn!(
                declared = declared_size,
                found = space.size(),
                "embedding header size differs from entries found"
            );
        }
        info!(terms = space.size(), dimensions, "embedding space loaded");
        Ok(space)
    }

    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading embedding space");
        let file = File::open(path)?;
        Self::load(BufReader::new(file))
    }

    /// Stored vector, `None` when the term is unknown.
    #[inline]
    pub fn get_vector(&self, term: &str) -> Option<&TermVector> {
        self.vectors.get(term)
    }

    #[inline]
    pub fn contains(&self, term: &str) -> bool {
        self.vectors.contains_key(term)
    }

    /// Cosine similarity of two words, `None` if either is unknown.
    pub fn word_similarity(&self, a: &str, b: &str, tolerance: f64) -> Result<Option<f64>> {
        match (self.get_vector(a), self.get_vector(b)) {
            (Some(va), Some(vb)) => va.cosine_similarity(vb, tolerance).map(Some),
            _ => Ok(None),
        }
    }

    #[inline]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Vocabulary size
    #[inline]
    pub fn size(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.vectors.keys().map(|k| k.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TermVector)> {
        self.vectors.iter().map(|(k, v)| (k.as_ref(), v))
    }
}

fn parse_header(line: &str, line_no: usize) -> Result<(usize, usize)> {
    let malformed = |reason: String| RerankError::MalformedSource { line: line_no, reason };
    let mut fields = line.split_whitespace();
    let mut next_num = |what: &str| -> Result<usize> {
        let raw = fields
            .next()
            .ok_or_else(|| malformed(format!("header is missing {what}")))?;
        raw.parse::<usize>()
            .map_err(|e| malformed(format!("header {what} {raw:?}: {e}")))
    };
    let size = next_num("vocabulary size")?;
    let dimensions = next_num("dimension count")?;
    if dimensions == 0 {
        return Err(malformed("dimension count must be positive".to_string()));
    }
    Ok((size, dimensions))
}
