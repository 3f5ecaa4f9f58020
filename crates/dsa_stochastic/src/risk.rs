//! Risk criteria over simulated debt paths.
//!
//! Each criterion maps an `n_paths × (horizon + 1)` debt matrix to a
//! probability in `[0, 1]`:
//!
//! - **declines**: share of paths whose final debt is at or below the
//!   cross-path mean at the criterion start column
//! - **stable**: share of 10,000 evenly spaced quantile levels at which the
//!   distribution of final-year debt is at or below that of the year four
//!   columns earlier
//! - **below 60**: share of paths ending at or below 60% of GDP

use std::fmt;
use std::str::FromStr;

use dsa_core::math::stats::{mean, sort_ascending};

use crate::error::RequestError;
use crate::simulator::PathMatrix;

/// Debt threshold of the below-60 criterion, percent of GDP.
pub const DEBT_THRESHOLD: f64 = 60.0;

/// Quantile levels compared by the stable criterion.
pub const STABLE_QUANTILE_LEVELS: usize = 10_000;

/// Column offset from the end compared by the stable criterion.
pub const STABLE_LOOKBACK: usize = 5;

/// Named risk criterion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RiskCriterion {
    /// Debt declines over the horizon.
    Declines,
    /// Debt distribution stabilises.
    Stable,
    /// Debt ends at or below 60% of GDP.
    #[cfg_attr(feature = "serde", serde(rename = "below_60"))]
    Below60,
}

impl fmt::Display for RiskCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskCriterion::Declines => f.write_str("declines"),
            RiskCriterion::Stable => f.write_str("stable"),
            RiskCriterion::Below60 => f.write_str("below_60"),
        }
    }
}

impl FromStr for RiskCriterion {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "declines" | "debt_declines" => Ok(RiskCriterion::Declines),
            "stable" | "debt_stable" => Ok(RiskCriterion::Stable),
            "below_60" | "below60" | "debt_below_60" => Ok(RiskCriterion::Below60),
            other => Err(RequestError::invalid(
                "criterion",
                format!("unknown risk criterion '{}'", other),
            )),
        }
    }
}

/// Probabilities of the selected criteria.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RiskProbabilities {
    /// Probability that debt declines.
    pub declines: Option<f64>,
    /// Probability that debt stabilises.
    pub stable: Option<f64>,
    /// Probability that debt ends at or below 60.
    pub below_60: Option<f64>,
}

impl RiskProbabilities {
    /// Probability of one criterion, if evaluated.
    pub fn get(&self, criterion: RiskCriterion) -> Option<f64> {
        match criterion {
            RiskCriterion::Declines => self.declines,
            RiskCriterion::Stable => self.stable,
            RiskCriterion::Below60 => self.below_60,
        }
    }

    /// Largest evaluated probability, `None` if nothing was evaluated.
    pub fn max_selected(&self) -> Option<f64> {
        [self.declines, self.stable, self.below_60]
            .into_iter()
            .flatten()
            .reduce(f64::max)
    }
}

/// Probability that final debt is at or below the mean debt at `start_col`.
///
/// The comparison is not strict.
pub fn prob_debt_declines(debt: &PathMatrix, start_col: usize) -> f64 {
    let reference = mean(&debt.column(start_col));
    let last = debt.n_cols() - 1;
    let count = (0..debt.n_paths())
        .filter(|&p| reference >= debt.get(p, last))
        .count();
    count as f64 / debt.n_paths() as f64
}

/// Probability that the debt distribution stabilises by the horizon end.
///
/// Compares the sorted final column against the sorted column
/// [`STABLE_LOOKBACK`] from the end at indices
/// `⌊i / 10000 · (n − 1)⌋` for `i = 0..10000`. Both columns are sorted
/// independently, so the result describes the two distributions rather
/// than individual paths.
///
/// # Errors
///
/// `RequestError::InvalidParameter` for a matrix without paths or with
/// fewer than [`STABLE_LOOKBACK`] columns.
pub fn prob_debt_stable(debt: &PathMatrix) -> Result<f64, RequestError> {
    if debt.n_paths() == 0 {
        return Err(RequestError::invalid("debt", "no simulated paths"));
    }
    if debt.n_cols() < STABLE_LOOKBACK {
        return Err(RequestError::invalid(
            "horizon",
            format!(
                "stable criterion needs at least {} columns, got {}",
                STABLE_LOOKBACK,
                debt.n_cols()
            ),
        ));
    }

    let last = debt.n_cols() - 1;
    let mut earlier = debt.column(debt.n_cols() - STABLE_LOOKBACK);
    let mut final_year = debt.column(last);
    sort_ascending(&mut earlier);
    sort_ascending(&mut final_year);

    let n = debt.n_paths();
    let count = (0..STABLE_QUANTILE_LEVELS)
        .filter(|&i| {
            let idx = (i as f64 / STABLE_QUANTILE_LEVELS as f64 * (n - 1) as f64) as usize;
            earlier[idx] >= final_year[idx]
        })
        .count();
    Ok(count as f64 / STABLE_QUANTILE_LEVELS as f64)
}

/// Probability that final debt is at or below [`DEBT_THRESHOLD`].
pub fn prob_debt_below_60(debt: &PathMatrix) -> f64 {
    let last = debt.n_cols() - 1;
    let count = (0..debt.n_paths())
        .filter(|&p| debt.get(p, last) <= DEBT_THRESHOLD)
        .count();
    count as f64 / debt.n_paths() as f64
}

/// Evaluates a set of criteria against debt paths.
#[derive(Clone, Debug, PartialEq)]
pub struct RiskEstimator {
    criteria: Vec<RiskCriterion>,
    criterion_start: usize,
}

impl RiskEstimator {
    /// Create an estimator.
    ///
    /// # Arguments
    ///
    /// * `criteria` - Criteria to evaluate
    /// * `criterion_start` - Column used as the reference by the declines criterion
    pub fn new(criteria: Vec<RiskCriterion>, criterion_start: usize) -> Self {
        Self {
            criteria,
            criterion_start,
        }
    }

    /// Selected criteria.
    pub fn criteria(&self) -> &[RiskCriterion] {
        &self.criteria
    }

    /// Reference column of the declines criterion.
    pub fn criterion_start(&self) -> usize {
        self.criterion_start
    }

    /// Evaluates every selected criterion.
    ///
    /// # Errors
    ///
    /// - `RequestError::NoCriteria` if nothing is selected
    /// - `RequestError::InvalidParameter` for an empty matrix, a criterion
    ///   start outside the matrix, or fewer than five columns with the
    ///   stable criterion selected
    pub fn evaluate(&self, debt: &PathMatrix) -> Result<RiskProbabilities, RequestError> {
        if self.criteria.is_empty() {
            return Err(RequestError::NoCriteria);
        }
        if debt.n_paths() == 0 || debt.n_cols() == 0 {
            return Err(RequestError::invalid("debt", "no simulated paths"));
        }

        let mut probs = RiskProbabilities::default();
        for criterion in &self.criteria {
            match criterion {
                RiskCriterion::Declines => {
                    if self.criterion_start >= debt.n_cols() {
                        return Err(RequestError::invalid(
                            "criterion_start",
                            format!(
                                "column {} outside a {}-column path",
                                self.criterion_start,
                                debt.n_cols()
                            ),
                        ));
                    }
                    probs.declines = Some(prob_debt_declines(debt, self.criterion_start));
                }
                RiskCriterion::Stable => {
                    probs.stable = Some(prob_debt_stable(debt)?);
                }
                RiskCriterion::Below60 => {
                    probs.below_60 = Some(prob_debt_below_60(debt));
                }
            }
        }
        Ok(probs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn matrix(rows: &[&[f64]]) -> PathMatrix {
        let n_cols = rows[0].len();
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        PathMatrix::from_rows(rows.len(), n_cols, data).unwrap()
    }

    // ========================================
    // Criterion Tests
    // ========================================

    #[test]
    fn test_declines_against_mean() {
        // Mean at column 0 is 80.
        let debt = matrix(&[&[70.0, 75.0], &[90.0, 80.0], &[80.0, 85.0]]);
        assert_relative_eq!(prob_debt_declines(&debt, 0), 2.0 / 3.0);
    }

    #[test]
    fn test_declines_comparison_not_strict() {
        let debt = matrix(&[&[50.0, 50.0], &[50.0, 50.0]]);
        assert_eq!(prob_debt_declines(&debt, 0), 1.0);
    }

    #[test]
    fn test_below_60_boundary() {
        let debt = matrix(&[&[70.0, 60.0], &[70.0, 60.000_001], &[70.0, 10.0], &[0.0, 61.0]]);
        assert_relative_eq!(prob_debt_below_60(&debt), 0.5);
    }

    #[test]
    fn test_stable_identical_columns() {
        let rows: Vec<Vec<f64>> = (0..100).map(|i| vec![i as f64; 6]).collect();
        let refs: Vec<&[f64]> = rows.iter().map(|r| r.as_slice()).collect();
        assert_eq!(prob_debt_stable(&matrix(&refs)).unwrap(), 1.0);
    }

    #[test]
    fn test_stable_rising_debt() {
        let rows: Vec<Vec<f64>> = (0..50)
            .map(|i| (0..6).map(|t| i as f64 + t as f64).collect())
            .collect();
        let refs: Vec<&[f64]> = rows.iter().map(|r| r.as_slice()).collect();
        assert_eq!(prob_debt_stable(&matrix(&refs)).unwrap(), 0.0);
    }

    #[test]
    fn test_stable_single_path() {
        let debt = matrix(&[&[1.0, 5.0, 0.0, 0.0, 0.0, 4.0]]);
        assert_eq!(prob_debt_stable(&debt).unwrap(), 1.0);
    }

    #[test]
    fn test_stable_compares_distributions_not_paths() {
        // Two of three paths fall, yet the sorted final column lies at or
        // below the sorted earlier column at every quantile.
        let debt = matrix(&[
            &[60.0, 0.0, 0.0, 0.0, 75.0],
            &[80.0, 0.0, 0.0, 0.0, 50.0],
            &[70.0, 0.0, 0.0, 0.0, 65.0],
        ]);
        let path_by_path = (0..3)
            .filter(|&p| debt.get(p, 0) >= debt.get(p, 4))
            .count();
        assert_eq!(path_by_path, 2);
        // Sorted: {60, 70, 80} against {50, 65, 75}.
        assert_eq!(prob_debt_stable(&debt).unwrap(), 1.0);
    }

    #[test]
    fn test_stable_short_matrix_is_error() {
        let debt = matrix(&[&[70.0, 65.0, 60.0, 55.0]]);
        assert!(matches!(
            prob_debt_stable(&debt),
            Err(RequestError::InvalidParameter { .. })
        ));
    }

    // ========================================
    // Estimator Tests
    // ========================================

    #[test]
    fn test_evaluate_selected_only() {
        let debt = matrix(&[&[70.0, 55.0], &[70.0, 65.0]]);
        let est = RiskEstimator::new(vec![RiskCriterion::Below60], 0);
        let probs = est.evaluate(&debt).unwrap();
        assert_eq!(probs.below_60, Some(0.5));
        assert_eq!(probs.declines, None);
        assert_eq!(probs.max_selected(), Some(0.5));
    }

    #[test]
    fn test_evaluate_errors() {
        let debt = matrix(&[&[70.0, 55.0]]);
        assert_eq!(
            RiskEstimator::new(vec![], 0).evaluate(&debt),
            Err(RequestError::NoCriteria)
        );
        assert!(RiskEstimator::new(vec![RiskCriterion::Declines], 2)
            .evaluate(&debt)
            .is_err());
        assert!(RiskEstimator::new(vec![RiskCriterion::Stable], 0)
            .evaluate(&debt)
            .is_err());
    }

    #[test]
    fn test_max_selected() {
        let probs = RiskProbabilities {
            declines: Some(0.3),
            stable: None,
            below_60: Some(0.8),
        };
        assert_eq!(probs.max_selected(), Some(0.8));
        assert_eq!(RiskProbabilities::default().max_selected(), None);
    }

    #[test]
    fn test_criterion_parse() {
        assert_eq!("below-60".parse::<RiskCriterion>().unwrap(), RiskCriterion::Below60);
        assert_eq!("Declines".parse::<RiskCriterion>().unwrap(), RiskCriterion::Declines);
        assert!("exploding".parse::<RiskCriterion>().is_err());
        assert_eq!(RiskCriterion::Below60.to_string(), "below_60");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_probabilities_in_unit_interval(values in prop::collection::vec(0.0f64..200.0, 12..60)) {
            let n_paths = values.len() / 6;
            let debt = PathMatrix::from_rows(n_paths, 6, values[..n_paths * 6].to_vec()).unwrap();
            let est = RiskEstimator::new(
                vec![RiskCriterion::Declines, RiskCriterion::Stable, RiskCriterion::Below60],
                0,
            );
            let probs = est.evaluate(&debt).unwrap();
            for p in [probs.declines, probs.stable, probs.below_60].into_iter().flatten() {
                prop_assert!((0.0..=1.0).contains(&p));
            }
        }

        #[test]
        fn prop_lower_debt_never_reduces_below_60(
            values in prop::collection::vec(0.0f64..120.0, 2..40),
            cut in 0.0f64..50.0,
        ) {
            let n = values.len();
            let data: Vec<f64> = values.iter().flat_map(|&v| [v, v]).collect();
            let lowered: Vec<f64> = values.iter().flat_map(|&v| [v, (v - cut).max(0.0)]).collect();
            let a = PathMatrix::from_rows(n, 2, data).unwrap();
            let b = PathMatrix::from_rows(n, 2, lowered).unwrap();
            prop_assert!(prob_debt_below_60(&b) >= prob_debt_below_60(&a));
        }
    }
}
