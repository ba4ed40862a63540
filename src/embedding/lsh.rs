use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::error::{RerankError, Result};
use crate::utils::math;

/// Locality-sensitive hash over raw vector components.
///
/// Implementations return one bucket per stage; two vectors "collide" when
/// every stage agrees.
pub trait LocalityHasher: Send + Sync {
    fn hash(&self, components: &[f64]) -> Result<Vec<u32>>;
}

const LARGE_PRIME: u64 = 433_494_437;
const ACC_MODULUS: u64 = i32::MAX as u64;

/// Super-Bit LSH
///
/// Random Gaussian hyperplanes, orthonormalised in batches of `superbit`
/// (Gram-Schmidt), give a sign signature of `stages * buckets / 2` bits.
/// The signature is split into `stages` bands and each band is folded into
/// a bucket index in `0..buckets`.
///
/// Deterministic for a given `seed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperBitLsh {
    stages: usize,
    buckets: usize,
    dimensions: usize,
    /// row-major, `code_length` hyperplanes of `dimensions` each
    hyperplanes: Vec<Vec<f64>>,
}

impl SuperBitLsh {
    pub fn new(stages: usize, buckets: usize, dimensions: usize, seed: u64) -> Result<Self> {
        if stages == 0 || buckets == 0 || dimensions == 0 {
            return Err(RerankError::InvalidConfig(format!(
                "lsh needs stages, buckets and dimensions >= 1 (got {stages}, {buckets}, {dimensions})"
            )));
        }
        let code_length = stages * buckets / 2;
        if code_length < stages {
            return Err(RerankError::InvalidConfig(format!(
                "lsh code length {code_length} is shorter than {stages} stages"
            )));
        }
        // largest batch size that fits the dimension and divides the code length
        let superbit = (1..=dimensions.min(code_length))
            .rev()
            .find(|s| code_length % s == 0)
            .unwrap_or(1);

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut hyperplanes: Vec<Vec<f64>> = (0..code_length)
            .map(|_| {
                (0..dimensions)
                    .map(|_| -> f64 { StandardNormal.sample(&mut rng) })
                    .collect::<Vec<f64>>()
            })
            .collect();

        for batch in hyperplanes.chunks_mut(superbit) {
            orthonormalize(batch);
        }

        Ok(Self {
            stages,
            buckets,
            dimensions,
            hyperplanes,
        })
    }

    pub fn stages(&self) -> usize {
        self.stages
    }

    pub fn buckets(&self) -> usize {
        self.buckets
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Sign bits, one per hyperplane.
    pub fn signature(&self, components: &[f64]) -> Result<Vec<bool>> {
        if components.len() != self.dimensions {
            return Err(RerankError::DimensionMismatch {
                expected: self.dimensions,
                actual: components.len(),
            });
        }
        Ok(self
            .hyperplanes
            .iter()
            .map(|h| math::dot(h, components) >= 0.0)
            .collect())
    }

    fn fold_signature(&self, signature: &[bool]) -> Vec<u32> {
        let rows = (signature.len() / self.stages).max(1);
        let mut acc = vec![0u64; self.stages];
        for (i, &bit) in signature.iter().enumerate() {
            if !bit {
                continue;
            }
            let v = ((i as u64 + 1) * LARGE_PRIME) % ACC_MODULUS;
            let stage = (i / rows).min(self.stages - 1);
            acc[stage] = (acc[stage] + v) % ACC_MODULUS;
        }
        acc.into_iter()
            .map(|a| (a % self.buckets as u64) as u32)
            .collect()
    }
}

impl LocalityHasher for SuperBitLsh {
    fn hash(&self, components: &[f64]) -> Result<Vec<u32>> {
        let signature = self.signature(components)?;
        Ok(self.fold_signature(&signature))
    }
}

/// In-place Gram-Schmidt over one batch of hyperplanes.
fn orthonormalize(batch: &mut [Vec<f64>]) {
    for i in 0..batch.len() {
        let (done, rest) = batch.split_at_mut(i);
        let current = &mut rest[0];
        for basis in done.iter() {
            let proj = math::dot(current, basis);
            for (c, b) in current.iter_mut().zip(basis.iter()) {
                *c -= proj * b;
            }
        }
        let n = math::norm(current);
        if n > 0.0 {
            current.iter_mut().for_each(|c| *c /= n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_shapes() {
        assert!(SuperBitLsh::new(0, 8, 4, 1).is_err());
        assert!(SuperBitLsh::new(2, 0, 4, 1).is_err());
        assert!(SuperBitLsh::new(2, 8, 0, 1).is_err());
        // code length 1 < 2 stages
        assert!(SuperBitLsh::new(2, 1, 4, 1).is_err());
    }

    #[test]
    fn hash_has_one_bucket_per_stage() {
        let lsh = SuperBitLsh::new(2, 8, 5, 42).unwrap();
        let h = lsh.hash(&[0.1, -0.4, 2.0, 0.0, 1.5]).unwrap();
        assert_eq!(h.len(), 2);
        assert!(h.iter().all(|&b| b < 8));
    }

    #[test]
    fn same_seed_same_hash() {
        let a = SuperBitLsh::new(3, 6, 4, 9).unwrap();
        let b = SuperBitLsh::new(3, 6, 4, 9).unwrap();
        let v = [0.5, -0.25, 1.0, 3.0];
        assert_eq!(a.hash(&v).unwrap(), b.hash(&v).unwrap());
    }

    #[test]
    fn batches_are_orthonormal() {
        let lsh = SuperBitLsh::new(2, 8, 4, 3).unwrap();
        // code length 8, superbit 4 -> two batches of four
        for batch in lsh.hyperplanes.chunks(4) {
            for (i, a) in batch.iter().enumerate() {
                assert!((math::norm(a) - 1.0).abs() < 1e-9);
                for b in batch.iter().skip(i + 1) {
                    assert!(math::dot(a, b).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn wrong_dimension_is_an_error() {
        let lsh = SuperBitLsh::new(2, 8, 3, 0).unwrap();
        assert!(matches!(
            lsh.hash(&[1.0, 2.0]),
            Err(RerankError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }
}
