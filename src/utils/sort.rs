use std::cmp::Ordering;

/// Ranking order for `(term, similarity)` pairs.
/// - Higher similarity first (`f64::total_cmp`)
/// - Equal similarity falls back to the term, lexicographically ascending
#[inline]
pub fn rank_order<T: AsRef<str>>(a: &(T, f64), b: &(T, f64)) -> Ordering {
    b.1.total_cmp(&a.1)
        .then_with(|| a.0.as_ref().cmp(b.0.as_ref()))
}

/// Keep the `k` best `(term, similarity)` pairs, sorted by [`rank_order`].
///
/// Uses a partial selection first so the full sort only touches `k` entries.
///
/// Complexity: O(n + k log k)
pub fn top_k<T: AsRef<str>>(mut items: Vec<(T, f64)>, k: usize) -> Vec<(T, f64)> {
    if k == 0 {
        return Vec::new();
    }
    if items.len() > k {
        items.select_nth_unstable_by(k - 1, rank_order);
        items.truncate(k);
    }
    items.sort_unstable_by(rank_order);
    items
}
