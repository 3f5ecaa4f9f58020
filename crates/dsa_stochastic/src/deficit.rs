//! Probability of an excessive deficit during the adjustment period.
//!
//! The stochastic window is moved onto the adjustment period plus one
//! year. Exchange-rate and primary-balance shocks are switched off at the
//! source; the primary balance instead responds to growth through the
//! budget balance elasticity. An adjustment year counts as excessive when
//! the overall balance falls below −3.5% of GDP, or below −3% in that
//! year and the next.

use dsa_core::types::{BaselinePaths, ShockPanel, ShockVariable};
use tracing::{info, instrument};

use crate::aggregator::AnnualChannel;
use crate::engine::{draw_annual_shocks, simulate_paths};
use crate::error::{RequestError, StochasticError};
use crate::request::{EstimationMode, SimulationRequest};
use crate::simulator::{simulate_overall_balance, PathMatrix, SimulatedPathSet};

/// Deficit threshold, percent of GDP.
pub const DEFICIT_THRESHOLD: f64 = -3.0;

/// Single-year severe deficit threshold, percent of GDP.
pub const SEVERE_DEFICIT_THRESHOLD: f64 = -3.5;

/// Adjustment period parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeficitRequest {
    /// Baseline index of the first adjustment year.
    pub adjustment_start: usize,
    /// Number of adjustment years.
    pub adjustment_period: usize,
    /// Response of the budget balance to a one-point growth shock.
    pub budget_balance_elasticity: f64,
}

impl DeficitRequest {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.adjustment_start == 0 {
            return Err(RequestError::invalid(
                "adjustment_start",
                "must leave one pre-adjustment baseline year",
            ));
        }
        if self.adjustment_period == 0 {
            return Err(RequestError::invalid("adjustment_period", "must be at least one year"));
        }
        if !self.budget_balance_elasticity.is_finite() {
            return Err(RequestError::invalid(
                "budget_balance_elasticity",
                format!("must be finite, got {}", self.budget_balance_elasticity),
            ));
        }
        Ok(())
    }
}

/// Excessive-deficit probabilities per adjustment year.
#[derive(Clone, Debug, PartialEq)]
pub struct DeficitResult {
    /// Seed that reproduces the run.
    pub seed: u64,
    /// Calendar year of each probability.
    pub years: Vec<i32>,
    /// Probability of an excessive deficit in each adjustment year.
    pub probabilities: Vec<f64>,
    /// Simulated paths including the overall balance.
    pub paths: SimulatedPathSet,
}

/// Share of paths with an excessive deficit in each adjustment year.
///
/// `ob` has `adjustment_period + 2` columns; column 0 is the
/// pre-adjustment year. Year `i` is excessive when
/// `ob[i+1] < −3.5` or both `ob[i+1] < −3` and `ob[i+2] < −3`.
pub fn prob_excessive_deficit(ob: &PathMatrix, adjustment_period: usize) -> Vec<f64> {
    debug_assert!(ob.n_cols() >= adjustment_period + 2);
    let n = ob.n_paths() as f64;
    (0..adjustment_period)
        .map(|i| {
            let count = (0..ob.n_paths())
                .filter(|&p| {
                    let this = ob.get(p, i + 1);
                    let next = ob.get(p, i + 2);
                    this < SEVERE_DEFICIT_THRESHOLD
                        || (this < DEFICIT_THRESHOLD && next < DEFICIT_THRESHOLD)
                })
                .count();
            count as f64 / n
        })
        .collect()
}

/// Simulates the overall balance over the adjustment period and returns
/// the excessive-deficit probability of each adjustment year.
///
/// Uses the path count, composition, maturity and seed of `request`,
/// always with normal draws.
///
/// The primary-balance shock of each year is the drawn growth shock times
/// `budget_balance_elasticity`. Growth and interest shocks are kept as
/// drawn; neither channel is overwritten.
///
/// # Errors
///
/// Request, data and estimation errors.
#[instrument(skip_all, fields(adjustment_start = deficit.adjustment_start, adjustment_period = deficit.adjustment_period))]
pub fn excessive_deficit_probability(
    request: &SimulationRequest,
    deficit: &DeficitRequest,
    panel: &ShockPanel,
    baseline: &BaselinePaths,
) -> Result<DeficitResult, StochasticError> {
    deficit.validate()?;
    let request = request
        .with_window(deficit.adjustment_start, deficit.adjustment_period + 1)
        .with_mode(EstimationMode::Normal);
    baseline.validate()?;
    request.check_window(baseline.len())?;

    let panel = panel.with_zeroed(&[
        ShockVariable::ExrEur,
        ShockVariable::ExrUsd,
        ShockVariable::PrimaryBalance,
    ]);
    let (seed, mut annual) = draw_annual_shocks(&request, &panel)?;

    let elasticity = deficit.budget_balance_elasticity;
    for path in 0..annual.n_paths() {
        for year in 0..annual.years() {
            let growth = annual.get(path, AnnualChannel::Growth, year);
            annual.set(path, AnnualChannel::PrimaryBalance, year, elasticity * growth);
        }
    }

    let mut paths = simulate_paths(&request, &annual, baseline)?;
    let ob_start = baseline.overall_balance[deficit.adjustment_start - 1];
    simulate_overall_balance(&mut paths, ob_start);

    let probabilities = match &paths.overall_balance {
        Some(ob) => prob_excessive_deficit(ob, deficit.adjustment_period),
        None => Vec::new(),
    };
    let years = (0..deficit.adjustment_period)
        .map(|i| baseline.year(deficit.adjustment_start + i))
        .collect();

    info!(
        seed,
        max_probability = probabilities.iter().copied().fold(0.0, f64::max),
        "deficit simulation complete"
    );

    Ok(DeficitResult {
        seed,
        years,
        probabilities,
        paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ob_matrix(rows: &[&[f64]]) -> PathMatrix {
        let n_cols = rows[0].len();
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        PathMatrix::from_rows(rows.len(), n_cols, data).unwrap()
    }

    // ========================================
    // Threshold Boundary Tests
    // ========================================

    #[test]
    fn test_severe_threshold_is_strict() {
        let ob = ob_matrix(&[&[0.0, -3.5, 0.0], &[0.0, -3.5001, 0.0]]);
        assert_eq!(prob_excessive_deficit(&ob, 1), vec![0.5]);
    }

    #[test]
    fn test_consecutive_threshold_is_strict() {
        let ob = ob_matrix(&[
            &[0.0, -3.1, -3.1],
            &[0.0, -3.1, -3.0],
            &[0.0, -3.0, -3.1],
            &[0.0, -3.1, -2.0],
        ]);
        assert_eq!(prob_excessive_deficit(&ob, 1), vec![0.25]);
    }

    #[test]
    fn test_per_year_probabilities() {
        // Period 3: columns 1..=3 judged, column 4 only as the following year.
        let ob = ob_matrix(&[
            &[-9.0, -4.0, -1.0, -3.2, -3.2],
            &[-9.0, -1.0, -1.0, -1.0, -1.0],
        ]);
        assert_eq!(prob_excessive_deficit(&ob, 3), vec![0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_request_validation() {
        let ok = DeficitRequest {
            adjustment_start: 3,
            adjustment_period: 4,
            budget_balance_elasticity: 0.5,
        };
        assert!(ok.validate().is_ok());
        assert!(DeficitRequest { adjustment_start: 0, ..ok }.validate().is_err());
        assert!(DeficitRequest { adjustment_period: 0, ..ok }.validate().is_err());
        assert!(DeficitRequest {
            budget_balance_elasticity: f64::NAN,
            ..ok
        }
        .validate()
        .is_err());
    }
}
