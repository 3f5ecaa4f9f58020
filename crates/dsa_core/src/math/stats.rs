//! Descriptive statistics over sample slices.
//!
//! Quantiles use linear interpolation between order statistics: for `n`
//! sorted values the `q`-quantile sits at fractional rank `q · (n − 1)`.
//! The helpers are generic over `num_traits::Float`.

use std::cmp::Ordering;

use num_traits::Float;

/// Arithmetic mean. Returns NaN for an empty slice.
#[inline]
pub fn mean<T: Float>(values: &[T]) -> T {
    let sum = values.iter().fold(T::zero(), |acc, &v| acc + v);
    match T::from(values.len()) {
        Some(n) if !n.is_zero() => sum / n,
        _ => T::nan(),
    }
}

/// Linear-interpolated quantile of an unsorted sample.
///
/// `q` is clamped to [0, 1]. Returns NaN for an empty slice.
///
/// # Examples
///
/// ```
/// use dsa_core::math::stats::quantile;
///
/// let xs = [3.0, 1.0, 2.0, 4.0];
/// assert_eq!(quantile(&xs, 0.5), 2.5);
/// assert_eq!(quantile(&xs, 1.0), 4.0);
/// ```
pub fn quantile<T: Float>(values: &[T], q: f64) -> T {
    let mut sorted = values.to_vec();
    sort_ascending(&mut sorted);
    quantile_sorted(&sorted, q)
}

/// Linear-interpolated quantile of an already sorted sample.
pub fn quantile_sorted<T: Float>(sorted: &[T], q: f64) -> T {
    let n = sorted.len();
    if n == 0 {
        return T::nan();
    }
    let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = (rank.floor() as usize).min(n - 1);
    let hi = (lo + 1).min(n - 1);
    let frac = T::from(rank - lo as f64).unwrap_or_else(T::zero);
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Sorts in ascending order; NaNs compare equal to everything.
pub fn sort_ascending<T: Float>(values: &mut [T]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
}

/// Several quantiles of one sample, sorting it once.
///
/// `percents` are on the 0–100 scale.
pub fn percentiles<T: Float>(values: &[T], percents: &[f64]) -> Vec<T> {
    let mut sorted = values.to_vec();
    sort_ascending(&mut sorted);
    percents
        .iter()
        .map(|p| quantile_sorted(&sorted, p / 100.0))
        .collect()
}

/// Rounds to the nearest integer, ties to even (`2.5 → 2`, `3.5 → 4`).
#[inline]
pub fn round_half_even(x: f64) -> f64 {
    x.round_ties_even()
}
