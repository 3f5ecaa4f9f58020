//! Debt-path simulation.
//!
//! Annual shocks are added to the baseline over the stochastic window and
//! the debt ratio is rolled forward with the debt-dynamics recurrence:
//!
//! ```text
//! d[t] = d[t−1] · (1 + i[t]/100) / (1 + g[t]/100)
//!        · (s_dom + s_eur · e_eur[t]/e_eur[t−1] + s_usd · e_usd[t]/e_usd[t−1])
//!        − pb[t] + sf[t]
//! ```
//!
//! Column 0 of every simulated path holds the last pre-stochastic baseline
//! value. Negative debt ratios are clamped to zero once the recurrence has
//! run.

use dsa_core::types::{BaselinePaths, DebtComposition};
use tracing::debug;

use crate::aggregator::{AnnualChannel, AnnualShockEnsemble};
use crate::error::RequestError;

/// Dense `n_paths × n_cols` matrix of simulated values, row per path.
#[derive(Clone, Debug, PartialEq)]
pub struct PathMatrix {
    n_paths: usize,
    n_cols: usize,
    data: Vec<f64>,
}

impl PathMatrix {
    /// All-zero matrix.
    pub fn zeros(n_paths: usize, n_cols: usize) -> Self {
        Self {
            n_paths,
            n_cols,
            data: vec![0.0; n_paths * n_cols],
        }
    }

    /// Builds a matrix from row-major data.
    ///
    /// Returns `None` if the length does not match.
    pub fn from_rows(n_paths: usize, n_cols: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == n_paths * n_cols).then_some(Self {
            n_paths,
            n_cols,
            data,
        })
    }

    /// Number of paths.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Number of columns (stochastic years plus the starting column).
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Value of one path at one column.
    #[inline]
    pub fn get(&self, path: usize, col: usize) -> f64 {
        self.data[path * self.n_cols + col]
    }

    /// Overwrite one value.
    #[inline]
    pub fn set(&mut self, path: usize, col: usize, value: f64) {
        self.data[path * self.n_cols + col] = value;
    }

    /// One path.
    #[inline]
    pub fn row(&self, path: usize) -> &[f64] {
        &self.data[path * self.n_cols..(path + 1) * self.n_cols]
    }

    /// Copy of one column across all paths.
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.data.iter().skip(col).step_by(self.n_cols).copied().collect()
    }

    /// Last column across all paths.
    pub fn last_column(&self) -> Vec<f64> {
        self.column(self.n_cols - 1)
    }

    /// Row-major data.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

/// Simulated paths of every debt-dynamics variable.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatedPathSet {
    /// Index of the first stochastic year in the baseline.
    pub stochastic_start: usize,
    /// Debt-to-GDP ratio.
    pub debt: PathMatrix,
    /// Exchange rate against the euro.
    pub exr_eur: PathMatrix,
    /// Exchange rate against the US dollar.
    pub exr_usd: PathMatrix,
    /// Implicit interest rate.
    pub implicit_rate: PathMatrix,
    /// Nominal GDP growth.
    pub growth: PathMatrix,
    /// Primary balance.
    pub primary_balance: PathMatrix,
    /// Stock-flow adjustment (not shocked).
    pub stock_flow: PathMatrix,
    /// Overall balance, populated by deficit simulation only.
    pub overall_balance: Option<PathMatrix>,
}

impl SimulatedPathSet {
    /// Number of paths.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.debt.n_paths()
    }

    /// Number of simulated years (excluding the starting column).
    #[inline]
    pub fn years(&self) -> usize {
        self.debt.n_cols() - 1
    }

    /// Baseline index of a column.
    #[inline]
    pub fn baseline_index(&self, col: usize) -> usize {
        self.stochastic_start - 1 + col
    }
}

/// Adds annual shocks to the baseline over the stochastic window.
///
/// Debt is only seeded at column 0; [`simulate_debt`] fills the rest.
///
/// # Errors
///
/// - `RequestError::InvalidParameter` if the ensemble has no years
/// - `RequestError::WindowOutOfRange` if `stochastic_start` is zero or the
///   window runs past the end of the baseline
pub fn combine(
    annual: &AnnualShockEnsemble,
    baseline: &BaselinePaths,
    stochastic_start: usize,
) -> Result<SimulatedPathSet, RequestError> {
    let years = annual.years();
    if years == 0 {
        return Err(RequestError::invalid("annual", "shock ensemble has no years"));
    }
    let end = stochastic_start + years - 1;
    if stochastic_start == 0 || end >= baseline.len() {
        return Err(RequestError::WindowOutOfRange {
            start: stochastic_start,
            end,
            baseline_len: baseline.len(),
        });
    }

    let n_paths = annual.n_paths();
    let n_cols = years + 1;
    let window = stochastic_start - 1..=end;

    let shocked = |series: &[f64], channel: Option<AnnualChannel>| -> PathMatrix {
        let base = &series[window.clone()];
        let mut matrix = PathMatrix::zeros(n_paths, n_cols);
        for path in 0..n_paths {
            let row = &mut matrix.as_mut_slice()[path * n_cols..(path + 1) * n_cols];
            row.copy_from_slice(base);
            if let Some(channel) = channel {
                for (value, shock) in row[1..].iter_mut().zip(annual.series(path, channel)) {
                    *value += shock;
                }
            }
        }
        matrix
    };

    let mut debt = PathMatrix::zeros(n_paths, n_cols);
    let d0 = baseline.debt[stochastic_start - 1];
    for path in 0..n_paths {
        debt.set(path, 0, d0);
    }

    Ok(SimulatedPathSet {
        stochastic_start,
        debt,
        exr_eur: shocked(&baseline.exr_eur, Some(AnnualChannel::ExrEur)),
        exr_usd: shocked(&baseline.exr_usd, Some(AnnualChannel::ExrUsd)),
        implicit_rate: shocked(&baseline.implicit_rate, Some(AnnualChannel::Interest)),
        growth: shocked(&baseline.growth, Some(AnnualChannel::Growth)),
        primary_balance: shocked(&baseline.primary_balance, Some(AnnualChannel::PrimaryBalance)),
        stock_flow: shocked(&baseline.stock_flow, None),
        overall_balance: None,
    })
}

/// Rolls the debt ratio forward on every path, then clamps negatives to zero.
///
/// Paths are independent and run in parallel when the `parallel` feature
/// is enabled. Results are identical either way.
pub fn simulate_debt(paths: &mut SimulatedPathSet, composition: &DebtComposition) {
    let n_cols = paths.debt.n_cols();
    let inputs = PathInputs {
        exr_eur: &paths.exr_eur,
        exr_usd: &paths.exr_usd,
        implicit_rate: &paths.implicit_rate,
        growth: &paths.growth,
        primary_balance: &paths.primary_balance,
        stock_flow: &paths.stock_flow,
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        paths
            .debt
            .data
            .par_chunks_mut(n_cols)
            .enumerate()
            .for_each(|(path, row)| roll_forward(row, path, &inputs, composition));
    }

    #[cfg(not(feature = "parallel"))]
    {
        for (path, row) in paths.debt.data.chunks_mut(n_cols).enumerate() {
            roll_forward(row, path, &inputs, composition);
        }
    }

    let clamped = clamp_non_negative(&mut paths.debt);
    if clamped > 0 {
        debug!(clamped, "clamped negative debt ratios to zero");
    }
}

struct PathInputs<'a> {
    exr_eur: &'a PathMatrix,
    exr_usd: &'a PathMatrix,
    implicit_rate: &'a PathMatrix,
    growth: &'a PathMatrix,
    primary_balance: &'a PathMatrix,
    stock_flow: &'a PathMatrix,
}

#[inline]
fn roll_forward(debt: &mut [f64], path: usize, inputs: &PathInputs<'_>, comp: &DebtComposition) {
    let eur = inputs.exr_eur.row(path);
    let usd = inputs.exr_usd.row(path);
    let iir = inputs.implicit_rate.row(path);
    let ng = inputs.growth.row(path);
    let pb = inputs.primary_balance.row(path);
    let sf = inputs.stock_flow.row(path);

    for t in 1..debt.len() {
        let mut currency = comp.domestic;
        if comp.eur != 0.0 {
            currency += comp.eur * eur[t] / eur[t - 1];
        }
        if comp.usd != 0.0 {
            currency += comp.usd * usd[t] / usd[t - 1];
        }
        debt[t] = currency * debt[t - 1] * (1.0 + iir[t] / 100.0) / (1.0 + ng[t] / 100.0)
            - pb[t]
            + sf[t];
    }
}

/// Replaces negative values with zero and returns how many were replaced.
///
/// Idempotent.
pub fn clamp_non_negative(matrix: &mut PathMatrix) -> usize {
    let mut count = 0;
    for value in matrix.as_mut_slice() {
        if *value < 0.0 {
            *value = 0.0;
            count += 1;
        }
    }
    count
}

/// Computes the overall balance on every path.
///
/// `ob[t] = pb[t] − i[t]/100 / (1 + g[t]/100) · d[t−1]`, with column 0 set
/// to `ob_start`.
pub fn simulate_overall_balance(paths: &mut SimulatedPathSet, ob_start: f64) {
    let n_paths = paths.n_paths();
    let n_cols = paths.debt.n_cols();
    let mut ob = PathMatrix::zeros(n_paths, n_cols);

    for path in 0..n_paths {
        let d = paths.debt.row(path);
        let pb = paths.primary_balance.row(path);
        let iir = paths.implicit_rate.row(path);
        let ng = paths.growth.row(path);
        ob.set(path, 0, ob_start);
        for t in 1..n_cols {
            ob.set(path, t, pb[t] - iir[t] / 100.0 / (1.0 + ng[t] / 100.0) * d[t - 1]);
        }
    }
    paths.overall_balance = Some(ob);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn baseline(n: usize) -> BaselinePaths {
        BaselinePaths {
            start_year: 2023,
            debt: (0..n).map(|i| 90.0 - i as f64).collect(),
            exr_eur: vec![1.0; n],
            exr_usd: vec![1.2; n],
            implicit_rate: vec![3.0; n],
            growth: vec![4.0; n],
            primary_balance: vec![1.0; n],
            stock_flow: vec![0.5; n],
            overall_balance: vec![-2.0; n],
        }
    }

    fn domestic() -> DebtComposition {
        DebtComposition::domestic_only(0.2).unwrap()
    }

    // ========================================
    // Combine Tests
    // ========================================

    #[test]
    fn test_combine_seeds_column_zero() {
        let base = baseline(10);
        let annual = AnnualShockEnsemble::zeros(3, 4);
        let paths = combine(&annual, &base, 2).unwrap();
        assert_eq!(paths.years(), 4);
        assert_eq!(paths.baseline_index(0), 1);
        for path in 0..3 {
            assert_eq!(paths.debt.get(path, 0), 89.0);
            assert_eq!(paths.growth.row(path), &[4.0; 5]);
        }
    }

    #[test]
    fn test_combine_adds_shocks_except_stock_flow() {
        let base = baseline(6);
        let mut annual = AnnualShockEnsemble::zeros(2, 3);
        for ch in AnnualChannel::ALL {
            annual.set(1, ch, 2, 0.7);
        }
        let paths = combine(&annual, &base, 1).unwrap();
        assert_relative_eq!(paths.growth.get(1, 3), 4.7);
        assert_relative_eq!(paths.implicit_rate.get(1, 3), 3.7);
        assert_relative_eq!(paths.exr_usd.get(1, 3), 1.9);
        assert_eq!(paths.stock_flow.get(1, 3), 0.5);
        assert_eq!(paths.growth.get(0, 3), 4.0);
    }

    #[test]
    fn test_combine_window_checks() {
        let base = baseline(6);
        let annual = AnnualShockEnsemble::zeros(1, 5);
        assert!(combine(&annual, &base, 1).is_ok());
        assert!(matches!(
            combine(&annual, &base, 2),
            Err(RequestError::WindowOutOfRange { start: 2, end: 6, baseline_len: 6 })
        ));
        assert!(combine(&annual, &base, 0).is_err());
    }

    #[test]
    fn test_combine_empty_ensemble_is_error() {
        let base = baseline(6);
        let annual = AnnualShockEnsemble::zeros(3, 0);
        assert!(matches!(
            combine(&annual, &base, 1),
            Err(RequestError::InvalidParameter { .. })
        ));
    }

    // ========================================
    // Debt Recurrence Tests
    // ========================================

    #[test]
    fn test_zero_shocks_follow_deterministic_recurrence() {
        let base = baseline(8);
        let annual = AnnualShockEnsemble::zeros(4, 5);
        let mut paths = combine(&annual, &base, 2).unwrap();
        simulate_debt(&mut paths, &domestic());

        let mut d = 89.0;
        for t in 1..=5 {
            d = d * 1.03 / 1.04 - 1.0 + 0.5;
            for path in 0..4 {
                assert_relative_eq!(paths.debt.get(path, t), d, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_foreign_currency_share_uses_exchange_rate_ratio() {
        let base = baseline(3);
        let mut annual = AnnualShockEnsemble::zeros(1, 1);
        annual.set(0, AnnualChannel::ExrEur, 0, 0.1);
        let mut paths = combine(&annual, &base, 1).unwrap();
        let comp = DebtComposition::new(0.5, 0.5, 0.0, 0.2, 0.8).unwrap();
        simulate_debt(&mut paths, &comp);

        let growth_factor = 90.0 * 1.03 / 1.04;
        let expected = 0.5 * growth_factor + 0.5 * growth_factor * 1.1 - 1.0 + 0.5;
        assert_relative_eq!(paths.debt.get(0, 1), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_debt_clamped_after_recurrence() {
        let mut base = baseline(4);
        base.debt = vec![5.0; 4];
        base.primary_balance = vec![20.0; 4];
        let annual = AnnualShockEnsemble::zeros(2, 3);
        let mut paths = combine(&annual, &base, 1).unwrap();
        simulate_debt(&mut paths, &domestic());
        for path in 0..2 {
            assert!(paths.debt.row(path).iter().all(|&d| d >= 0.0));
            assert_eq!(paths.debt.get(path, 1), 0.0);
        }
    }

    #[test]
    fn test_clamp_is_idempotent() {
        let mut m = PathMatrix::from_rows(2, 2, vec![-1.0, 2.0, 0.0, -3.0]).unwrap();
        assert_eq!(clamp_non_negative(&mut m), 2);
        let once = m.clone();
        assert_eq!(clamp_non_negative(&mut m), 0);
        assert_eq!(m, once);
        assert_eq!(m.as_slice(), &[0.0, 2.0, 0.0, 0.0]);
    }

    // ========================================
    // Overall Balance Tests
    // ========================================

    #[test]
    fn test_overall_balance() {
        let base = baseline(5);
        let annual = AnnualShockEnsemble::zeros(1, 2);
        let mut paths = combine(&annual, &base, 1).unwrap();
        simulate_debt(&mut paths, &domestic());
        simulate_overall_balance(&mut paths, -2.5);

        let ob = paths.overall_balance.as_ref().unwrap();
        assert_eq!(ob.get(0, 0), -2.5);
        assert_relative_eq!(ob.get(0, 1), 1.0 - 0.03 / 1.04 * 90.0, epsilon = 1e-12);
        let d1 = paths.debt.get(0, 1);
        assert_relative_eq!(ob.get(0, 2), 1.0 - 0.03 / 1.04 * d1, epsilon = 1e-12);
    }

    #[test]
    fn test_path_matrix_columns() {
        let m = PathMatrix::from_rows(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m.column(1), vec![2.0, 5.0]);
        assert_eq!(m.last_column(), vec![3.0, 6.0]);
        assert!(PathMatrix::from_rows(2, 3, vec![0.0; 5]).is_none());
    }
}
