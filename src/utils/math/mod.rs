use num::Num;

/// dot積
/// d(a, b) = Σ(a_i * b_i)
///
/// Both slices must have the same length; callers check dimensionality first.
#[inline]
pub fn dot<N>(a: &[N], b: &[N]) -> f64
where
    N: Num + Copy + Into<f64>,
{
    debug_assert_eq!(
        a.len(),
        b.len(),
        "Vectors must be of the same length to compute dot product."
    );
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| x.into() * y.into())
        .sum()
}

#[inline]
pub fn norm_sq<N>(a: &[N]) -> f64
where
    N: Num + Copy + Into<f64>,
{
    a.iter()
        .map(|&x| {
            let v: f64 = x.into();
            v * v
        })
        .sum()
}

/// ||a|| = sqrt(Σ(a_i^2))
#[inline]
pub fn norm<N>(a: &[N]) -> f64
where
    N: Num + Copy + Into<f64>,
{
    norm_sq(a).sqrt()
}

/// コサイン類似度
/// cos(θ) = Σ(a_i * b_i) / (||a|| * ||b||)
///
/// A zero-norm operand yields 0.0 rather than NaN.
#[inline]
pub fn cosine<N>(a: &[N], b: &[N]) -> f64
where
    N: Num + Copy + Into<f64>,
{
    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

/// Componentwise `-a`.
#[inline]
pub fn negated<N>(a: &[N]) -> Vec<N>
where
    N: Num + Copy,
{
    a.iter().map(|&x| N::zero() - x).collect()
}

/// Componentwise `a + b`.
#[inline]
pub fn sum<N>(a: &[N], b: &[N]) -> Vec<N>
where
    N: Num + Copy,
{
    debug_assert_eq!(
        a.len(),
        b.len(),
        "Vectors must be of the same length to add them."
    );
    a.iter().zip(b.iter()).map(|(&x, &y)| x + y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_and_norm_basics() {
        let a = [1.0f64, 2.0, 3.0];
        let b = [4.0f64, -5.0, 6.0];
        assert_eq!(dot(&a, &b), 4.0 - 10.0 + 18.0);
        assert_eq!(norm_sq(&a), 14.0);
        assert!((norm(&[3.0f64, 4.0]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        let zero = [0.0f64; 3];
        let a = [1.0f64, 0.0, 0.0];
        assert_eq!(cosine(&zero, &a), 0.0);
        assert_eq!(cosine(&a, &zero), 0.0);
    }

    #[test]
    fn cosine_works_on_f32() {
        let a = [1.0f32, 1.0];
        let b = [2.0f32, 2.0];
        assert!((cosine(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn negate_and_sum() {
        let a = [1.0f64, -2.0];
        let b = [0.5f64, 0.5];
        assert_eq!(negated(&a), vec![-1.0, 2.0]);
        assert_eq!(sum(&a, &b), vec![1.5, -1.5]);
    }
}
