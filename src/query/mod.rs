pub mod parser;

use std::borrow::Cow;

use crate::analysis::Tokenizer;
use crate::embedding::space::EmbeddingSpace;
use crate::embedding::vector::TermVector;
use crate::error::{RerankError, Result};

/// One query word with its own negation flag.
///
/// `vector` stays `None` until [`QueryAtom::resolve`] runs. Once resolved it
/// already carries the atom's sign, so a negated atom holds the negated
/// embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAtom {
    pub word: String,
    pub negated: bool,
    vector: Option<TermVector>,
}

impl QueryAtom {
    pub fn new(word: impl Into<String>, negated: bool) -> Self {
        Self {
            word: word.into(),
            negated,
            vector: None,
        }
    }

    /// Signed vector, `None` before resolution.
    #[inline]
    pub fn vector(&self) -> Option<&TermVector> {
        self.vector.as_ref()
    }

    /// Embedding of the word with the atom's sign applied, without storing it.
    pub fn lookup(&self, space: &EmbeddingSpace) -> Result<TermVector> {
        let found = space
            .get_vector(&self.word)
            .ok_or_else(|| RerankError::unknown_term(self.word.as_str()))?;
        Ok(if self.negated { found.negate() } else { found.clone() })
    }

    /// Look the word up, apply the atom's sign and keep the result.
    pub fn resolve(&mut self, space: &EmbeddingSpace) -> Result<&TermVector> {
        let signed = self.lookup(space)?;
        let resolved: &TermVector = self.vector.insert(signed);
        Ok(resolved)
    }

    /// The resolved vector, or a fresh lookup when not resolved yet.
    pub fn vector_or_lookup(&self, space: &EmbeddingSpace) -> Result<Cow<'_, TermVector>> {
        match &self.vector {
            Some(v) => Ok(Cow::Borrowed(v)),
            None => self.lookup(space).map(Cow::Owned),
        }
    }
}

/// Ordered group of atoms scored as one composite concept.
#[derive(Debug, Clone, PartialEq)]
pub struct Phrase {
    pub atoms: Vec<QueryAtom>,
    pub negated: bool,
    vector: Option<TermVector>,
}

impl Phrase {
    pub fn new(negated: bool) -> Self {
        Self {
            atoms: Vec::new(),
            negated,
            vector: None,
        }
    }

    pub fn with_atoms(atoms: Vec<QueryAtom>, negated: bool) -> Self {
        Self {
            atoms,
            negated,
            vector: None,
        }
    }

    /// Aggregate vector, `None` before [`Phrase::calculate_vector`].
    #[inline]
    pub fn vector(&self) -> Option<&TermVector> {
        self.vector.as_ref()
    }

    /// Compose the phrase vector without storing anything.
    ///
    /// Signed atom vectors (each negated when its own flag is set) are
    /// summed in atom order, then the sum is negated when the phrase itself
    /// is negated.
    ///
    /// # Errors
    /// `UnknownTerm` for a member word missing from `space`,
    /// `InvalidConfig` for a phrase without atoms.
    pub fn compose(&self, space: &EmbeddingSpace) -> Result<TermVector> {
        let mut sum: Option<TermVector> = None;
        for atom in &self.atoms {
            let v = atom.vector_or_lookup(space)?;
            sum = Some(match sum {
                Some(acc) => acc.add(&v)?,
                None => v.into_owned(),
            });
        }
        let sum = sum.ok_or_else(|| RerankError::InvalidConfig("phrase has no atoms".to_string()))?;
        Ok(if self.negated { sum.negate() } else { sum })
    }

    /// Resolve every member atom, then compose and keep the phrase vector.
    pub fn calculate_vector(&mut self, space: &EmbeddingSpace) -> Result<&TermVector> {
        for atom in self.atoms.iter_mut() {
            atom.resolve(space)?;
        }
        let composed = self.compose(space)?;
        let composed: &TermVector = self.vector.insert(composed);
        Ok(composed)
    }

    /// The composed vector, or a fresh composition when not calculated yet.
    pub fn vector_or_compose(&self, space: &EmbeddingSpace) -> Result<Cow<'_, TermVector>> {
        match &self.vector {
            Some(v) => Ok(Cow::Borrowed(v)),
            None => self.compose(space).map(Cow::Owned),
        }
    }
}

/// A parsed query: phrases plus the basic (non-phrase) atoms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredQuery {
    pub phrases: Vec<Phrase>,
    pub basic: Vec<QueryAtom>,
}

impl StructuredQuery {
    pub fn new(phrases: Vec<Phrase>, basic: Vec<QueryAtom>) -> Self {
        Self { phrases, basic }
    }

    /// Parse `text`, run every atom through `tokenizer` and leave vectors unset.
    pub fn parse<T>(text: &str, tokenizer: &T) -> Self
    where
        T: Tokenizer + ?Sized,
    {
        parser::parse_unfiltered(text).analyzed(tokenizer)
    }

    /// Parse, analyze and resolve every vector against `space`.
    pub fn build<T>(text: &str, tokenizer: &T, space: &EmbeddingSpace) -> Result<Self>
    where
        T: Tokenizer + ?Sized,
    {
        let mut query = Self::parse(text, tokenizer);
        query.resolve_vectors(space)?;
        Ok(query)
    }

    /// Replace each raw atom word by its analyzed form.
    ///
    /// Atoms yielding no token are dropped; several tokens are joined with a
    /// single space into one composite word. Phrases left without atoms are
    /// dropped too.
    pub fn analyzed<T>(self, tokenizer: &T) -> Self
    where
        T: Tokenizer + ?Sized,
    {
        let analyze = |atoms: Vec<QueryAtom>| -> Vec<QueryAtom> {
            atoms
                .into_iter()
                .filter_map(|atom| {
                    let tokens = tokenizer.tokenize(&atom.word);
                    if tokens.is_empty() {
                        None
                    } else {
                        Some(QueryAtom::new(tokens.join(" "), atom.negated))
                    }
                })
                .collect()
        };

        let phrases = self
            .phrases
            .into_iter()
            .map(|p| Phrase::with_atoms(analyze(p.atoms), p.negated))
            .filter(|p| !p.atoms.is_empty())
            .collect();
        let basic = analyze(self.basic);
        Self { phrases, basic }
    }

    /// Compose all phrase vectors and resolve all basic atoms.
    pub fn resolve_vectors(&mut self, space: &EmbeddingSpace) -> Result<()> {
        for phrase in self.phrases.iter_mut() {
            phrase.calculate_vector(space)?;
        }
        for atom in self.basic.iter_mut() {
            atom.resolve(space)?;
        }
        Ok(())
    }

    /// Phrases plus basic atoms
    pub fn len(&self) -> usize {
        self.phrases.len() + self.basic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty() && self.basic.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardTokenizer;

    fn words(atoms: &[QueryAtom]) -> Vec<(&str, bool)> {
        atoms.iter().map(|a| (a.word.as_str(), a.negated)).collect()
    }

    fn space() -> EmbeddingSpace {
        let mut s = EmbeddingSpace::new(2);
        s.insert("big", vec![1.0, 0.0]).unwrap();
        s.insert("house", vec![0.0, 1.0]).unwrap();
        s.insert("dog", vec![0.6, 0.8]).unwrap();
        s.insert("cat", vec![0.8, 0.6]).unwrap();
        s
    }

    #[test]
    fn parses_basic_and_phrase() {
        let q = StructuredQuery::parse("dog ~cat \"big house\"", &StandardTokenizer::new());
        assert_eq!(words(&q.basic), vec![("dog", false), ("cat", true)]);
        assert_eq!(q.phrases.len(), 1);
        assert_eq!(words(&q.phrases[0].atoms), vec![("big", false), ("house", false)]);
        assert!(!q.phrases[0].negated);
        assert!(q.basic.iter().all(|a| a.vector().is_none()));
    }

    #[test]
    fn parses_negated_phrase() {
        let q = StructuredQuery::parse("~\"big house\"", &StandardTokenizer::new());
        assert!(q.basic.is_empty());
        assert_eq!(q.phrases.len(), 1);
        assert!(q.phrases[0].negated);
        assert_eq!(words(&q.phrases[0].atoms), vec![("big", false), ("house", false)]);
    }

    #[test]
    fn phrase_vector_is_signed_sum() {
        let s = space();
        let mut p = Phrase::with_atoms(vec![QueryAtom::new("big", false), QueryAtom::new("house", false)], false);
        assert_eq!(p.calculate_vector(&s).unwrap().components(), &[1.0, 1.0]);

        let mut neg = Phrase::with_atoms(vec![QueryAtom::new("big", false), QueryAtom::new("house", false)], true);
        assert_eq!(neg.calculate_vector(&s).unwrap().components(), &[-1.0, -1.0]);

        let mut mixed = Phrase::with_atoms(vec![QueryAtom::new("big", false), QueryAtom::new("house", true)], true);
        assert_eq!(mixed.calculate_vector(&s).unwrap().components(), &[-1.0, 1.0]);
    }

    #[test]
    fn unresolved_items_compose_on_demand() {
        let s = space();
        let p = Phrase::with_atoms(vec![QueryAtom::new("big", true), QueryAtom::new("house", false)], false);
        assert!(p.vector().is_none());
        assert_eq!(p.vector_or_compose(&s).unwrap().components(), &[-1.0, 1.0]);
        let atom = QueryAtom::new("dog", true);
        assert_eq!(atom.vector_or_lookup(&s).unwrap().components(), &[-0.6, -0.8]);
        assert!(Phrase::new(false).compose(&s).is_err());
    }

    #[test]
    fn negated_basic_atom_holds_negated_vector() {
        let q = StructuredQuery::build("dog ~cat", &StandardTokenizer::new(), &space()).unwrap();
        assert_eq!(q.basic[0].vector().unwrap().components(), &[0.6, 0.8]);
        assert_eq!(q.basic[1].vector().unwrap().components(), &[-0.8, -0.6]);
    }

    #[test]
    fn unknown_word_fails_resolution() {
        let err = StructuredQuery::build("dog zebra", &StandardTokenizer::new(), &space()).unwrap_err();
        assert!(matches!(err, RerankError::UnknownTerm { ref term } if term == "zebra"));
    }

    #[test]
    fn analysis_drops_and_joins_atoms() {
        let q = StructuredQuery::parse("the Big-House ~.", &StandardTokenizer::new().with_stop_words(["the"]));
        // "the" and "." vanish, "Big-House" collapses into one composite atom
        assert_eq!(words(&q.basic), vec![("big house", false)]);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn phrase_of_dropped_atoms_disappears() {
        let q = StructuredQuery::parse("\"the of\" dog", &StandardTokenizer::new().with_stop_words(["the", "of"]));
        assert!(q.phrases.is_empty());
        assert_eq!(words(&q.basic), vec![("dog", false)]);
    }
}
