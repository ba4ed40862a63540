use crate::embedding::vector::TermVector;
use crate::error::Result;
use crate::query::QueryAtom;
use crate::scorer::{CalculationMode, DocumentScorer};

impl DocumentScorer<'_> {
    /// Similarity of a basic atom to one document token.
    ///
    /// `atom_vector` is the atom's signed vector. Unknown tokens give 0.0
    /// before anything else is looked at. A plain atom reads the
    /// precomputed matrix (0.0 when the pair was not recorded) unless the
    /// mode is `HashAll`; a negated atom has no matrix entries and is
    /// compared on the fly.
    pub fn atom_similarity(
        &self,
        token: &str,
        atom: &QueryAtom,
        atom_vector: &TermVector,
        mode: CalculationMode,
    ) -> Result<f64> {
        let Some(token_vector) = self.space.get_vector(token) else {
            return Ok(0.0);
        };
        match (mode, atom.negated) {
            (CalculationMode::HashAll, _) | (CalculationMode::Hash, true) => {
                atom_vector.approx_equal(token_vector, self.hasher)
            }
            (CalculationMode::Cosine, true) => atom_vector.cosine_similarity(token_vector, self.params.tolerance),
            (_, false) => Ok(self.matrix.get(&atom.word, token)),
        }
    }

    /// Similarity of a composed phrase vector to one document token.
    ///
    /// Phrase vectors are never in the matrix: cosine with tolerance, or
    /// hash equality for both hash modes.
    pub fn phrase_similarity(&self, token: &str, phrase_vector: &TermVector, mode: CalculationMode) -> Result<f64> {
        let Some(token_vector) = self.space.get_vector(token) else {
            return Ok(0.0);
        };
        match mode {
            CalculationMode::Cosine => phrase_vector.cosine_similarity(token_vector, self.params.tolerance),
            CalculationMode::Hash | CalculationMode::HashAll => phrase_vector.approx_equal(token_vector, self.hasher),
        }
    }
}
