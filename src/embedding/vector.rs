use serde::{Deserialize, Serialize};

use crate::embedding::lsh::LocalityHasher;
use crate::error::{RerankError, Result};
use crate::utils::math;

/// An embedding of one vocabulary term, or of a concept derived from terms
/// (a negation or a phrase sum).
///
/// The label is for display only. Negation is never recovered from it;
/// query atoms and phrases carry their own flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermVector {
    label: Box<str>,
    components: Box<[f64]>,
}

impl TermVector {
    pub fn new(label: impl Into<Box<str>>, components: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            components: components.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn components(&self) -> &[f64] {
        &self.components
    }

    #[inline]
    pub fn dimensions(&self) -> usize {
        self.components.len()
    }

    #[inline]
    fn check_dimensions(&self, other: &Self) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(RerankError::DimensionMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        Ok(())
    }

    /// Euclidean norm
    #[inline]
    pub fn norm(&self) -> f64 {
        math::norm(&self.components)
    }

    pub fn dot(&self, other: &Self) -> Result<f64> {
        self.check_dimensions(other)?;
        Ok(math::dot(&self.components, &other.components))
    }

    /// Cosine similarity, zeroed when it falls below `tolerance`.
    ///
    /// The clamp is one-sided: values at or above `tolerance` pass unchanged,
    /// including negative values when `tolerance` is itself negative.
    pub fn cosine_similarity(&self, other: &Self, tolerance: f64) -> Result<f64> {
        self.check_dimensions(other)?;
        let sim = math::cosine(&self.components, &other.components);
        Ok(if sim >= tolerance { sim } else { 0.0 })
    }

    /// Every component times -1. The label becomes `~"label"`.
    pub fn negate(&self) -> Self {
        Self {
            label: format!("~\"{}\"", self.label).into_boxed_str(),
            components: math::negated(&self.components).into_boxed_slice(),
        }
    }

    /// Componentwise sum; labels are joined with a space.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_dimensions(other)?;
        Ok(Self {
            label: format!("{} {}", self.label, other.label).into_boxed_str(),
            components: math::sum(&self.components, &other.components).into_boxed_slice(),
        })
    }

    /// Binary similarity proxy: 1.0 when every hash stage agrees, else 0.0.
    pub fn approx_equal<H>(&self, other: &Self, hasher: &H) -> Result<f64>
    where
        H: LocalityHasher + ?Sized,
    {
        self.check_dimensions(other)?;
        let a = hasher.hash(&self.components)?;
        let b = hasher.hash(&other.components)?;
        Ok(if a == b { 1.0 } else { 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::lsh::SuperBitLsh;

    fn v(label: &str, c: &[f64]) -> TermVector {
        TermVector::new(label, c.to_vec())
    }

    #[test]
    fn self_cosine_is_one() {
        let a = v("a", &[0.3, -1.2, 4.0]);
        assert!((a.cosine_similarity(&a, 0.0).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn negated_cosine_is_minus_one_or_clamped() {
        let a = v("a", &[0.3, -1.2, 4.0]);
        let neg = a.negate();
        assert!((a.cosine_similarity(&neg, 0.0).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(a.cosine_similarity(&neg, 0.5).unwrap(), 0.0);
    }

    #[test]
    fn clamp_is_one_sided() {
        let a = v("a", &[1.0, 0.0]);
        let b = v("b", &[1.0, 1.0]);
        let sim = a.cosine_similarity(&b, 0.0).unwrap();
        assert!((sim - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
        // high values are never capped
        assert_eq!(a.cosine_similarity(&b, sim).unwrap(), sim);
        assert_eq!(a.cosine_similarity(&b, sim + 1e-9).unwrap(), 0.0);
    }

    #[test]
    fn labels_are_display_only() {
        let a = v("big", &[1.0, 0.0]);
        let b = v("house", &[0.0, 1.0]);
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.label(), "big house");
        assert_eq!(sum.components(), &[1.0, 1.0]);
        let neg = sum.negate();
        assert_eq!(neg.label(), "~\"big house\"");
        assert_eq!(neg.components(), &[-1.0, -1.0]);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let a = v("a", &[1.0, 0.0]);
        let b = v("b", &[1.0, 0.0, 0.0]);
        assert!(matches!(
            a.dot(&b),
            Err(RerankError::DimensionMismatch { expected: 2, actual: 3 })
        ));
        assert!(a.add(&b).is_err());
        assert!(a.cosine_similarity(&b, 0.0).is_err());
    }

    #[test]
    fn approx_equal_is_binary() {
        let lsh = SuperBitLsh::new(2, 8, 3, 7).unwrap();
        let a = v("a", &[1.0, 2.0, 3.0]);
        let scaled = v("a2", &[2.0, 4.0, 6.0]);
        // same direction, same hyperplane sides
        assert_eq!(a.approx_equal(&scaled, &lsh).unwrap(), 1.0);
        let far = a.negate();
        let sim = a.approx_equal(&far, &lsh).unwrap();
        assert!(sim == 0.0 || sim == 1.0);
    }
}
