//! Linear primary-balance adjustment on top of a fixed baseline.

use dsa_core::types::BaselinePaths;
use dsa_stochastic::{BaselineProjector, ProjectionError};

/// Projects a baseline in which the primary balance moves linearly from
/// its pre-adjustment value to the policy level over the adjustment
/// years, and keeps the baseline's later year-on-year changes on top of
/// it afterwards.
///
/// Debt and the overall balance absorb the primary-balance change
/// through the deterministic debt recurrence.
#[derive(Clone, Debug)]
pub struct LinearAdjustmentProjector {
    baseline: BaselinePaths,
    adjustment_start: usize,
    adjustment_period: usize,
}

impl LinearAdjustmentProjector {
    /// Creates a projector over `baseline`.
    pub fn new(
        baseline: BaselinePaths,
        adjustment_start: usize,
        adjustment_period: usize,
    ) -> Result<Self, ProjectionError> {
        let end = adjustment_start + adjustment_period;
        if adjustment_start == 0 || adjustment_period == 0 || end > baseline.len() {
            return Err(ProjectionError::new(format!(
                "adjustment window {}..{} does not fit a baseline of {} years",
                adjustment_start,
                end,
                baseline.len()
            )));
        }
        Ok(Self {
            baseline,
            adjustment_start,
            adjustment_period,
        })
    }

    /// Primary balance path reaching `target` at the end of adjustment.
    fn primary_balance(&self, target: f64) -> Vec<f64> {
        let base = &self.baseline.primary_balance;
        let start = self.adjustment_start;
        let end = start + self.adjustment_period - 1;
        let anchor = base[start - 1];
        let step = (target - anchor) / self.adjustment_period as f64;

        let mut pb = base.clone();
        for (i, value) in pb.iter_mut().enumerate().skip(start) {
            *value = if i <= end {
                anchor + step * (i + 1 - start) as f64
            } else {
                target + base[i] - base[end]
            };
        }
        pb
    }
}

impl BaselineProjector for LinearAdjustmentProjector {
    fn project(&mut self, policy: Option<f64>) -> Result<BaselinePaths, ProjectionError> {
        let Some(target) = policy else {
            return Ok(self.baseline.clone());
        };
        if !target.is_finite() {
            return Err(ProjectionError::new(format!("non-finite policy {}", target)));
        }

        let base = &self.baseline;
        let mut out = base.clone();
        out.primary_balance = self.primary_balance(target);

        // Propagate the primary-balance gap through the debt recurrence.
        let mut debt_gap = 0.0;
        for i in self.adjustment_start..base.len() {
            let pb_gap = out.primary_balance[i] - base.primary_balance[i];
            let rate = base.implicit_rate[i] / 100.0;
            let growth = 1.0 + base.growth[i] / 100.0;
            let interest_gap = rate * debt_gap / growth;
            debt_gap = debt_gap * (1.0 + rate) / growth - pb_gap;
            out.debt[i] = base.debt[i] + debt_gap;
            out.overall_balance[i] = base.overall_balance[i] + pb_gap - interest_gap;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn baseline() -> BaselinePaths {
        let n = 8;
        BaselinePaths {
            start_year: 2024,
            debt: vec![80.0; n],
            exr_eur: vec![1.0; n],
            exr_usd: vec![1.0; n],
            implicit_rate: vec![0.0; n],
            growth: vec![0.0; n],
            primary_balance: vec![-1.0, -1.0, -1.0, -1.0, -1.0, -0.5, -0.5, -0.5],
            stock_flow: vec![0.0; n],
            overall_balance: vec![-3.0; n],
        }
    }

    #[test]
    fn test_no_policy_returns_baseline() {
        let mut projector = LinearAdjustmentProjector::new(baseline(), 1, 4).unwrap();
        assert_eq!(projector.project(None).unwrap(), baseline());
    }

    #[test]
    fn test_linear_path_and_carry_over() {
        let mut projector = LinearAdjustmentProjector::new(baseline(), 1, 4).unwrap();
        let out = projector.project(Some(1.0)).unwrap();
        assert_eq!(out.primary_balance[0], -1.0);
        assert_relative_eq!(out.primary_balance[1], -0.5);
        assert_relative_eq!(out.primary_balance[4], 1.0);
        // Baseline rises by 0.5 after the adjustment end.
        assert_relative_eq!(out.primary_balance[5], 1.5);
        assert_relative_eq!(out.primary_balance[7], 1.5);
    }

    #[test]
    fn test_debt_absorbs_primary_balance_gap() {
        let mut projector = LinearAdjustmentProjector::new(baseline(), 1, 4).unwrap();
        let out = projector.project(Some(1.0)).unwrap();
        // Zero interest and growth: debt falls by the cumulative gap.
        assert_relative_eq!(out.debt[1], 79.5);
        assert_relative_eq!(out.debt[2], 78.5);
        assert_relative_eq!(out.debt[4], 75.0);
        assert_relative_eq!(out.overall_balance[4], -1.0);
        assert_eq!(out.debt[0], 80.0);
    }

    #[test]
    fn test_interest_on_debt_gap() {
        let base = BaselinePaths {
            implicit_rate: vec![5.0; 8],
            ..baseline()
        };
        let mut projector = LinearAdjustmentProjector::new(base.clone(), 1, 1).unwrap();
        let out = projector.project(Some(0.0)).unwrap();
        // One-point gap in year 1 compounds at 5% in year 2.
        assert_relative_eq!(out.debt[1], base.debt[1] - 1.0);
        assert_relative_eq!(out.debt[2], base.debt[2] - 2.05, epsilon = 1e-12);
        assert_relative_eq!(out.overall_balance[2], base.overall_balance[2] + 1.0 + 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_window() {
        assert!(LinearAdjustmentProjector::new(baseline(), 0, 4).is_err());
        assert!(LinearAdjustmentProjector::new(baseline(), 5, 4).is_err());
    }
}
