//! Historical shock panels.
//!
//! A [`ShockPanel`] holds the observed shocks of one country at one
//! frequency, one row per period, with the six columns in
//! [`ShockVariable`] order. [`PanelSource`] bundles the quarterly and
//! annual panels of a country and resolves the frequency fallback.

use tracing::warn;

use super::error::{DataError, EstimationError};
use super::shock::{ShockFrequency, ShockVariable, N_SHOCK_VARIABLES};
use crate::math::linalg::CovarianceMatrix;
use crate::math::stats::quantile;

/// Lower quantile used for winsorisation.
pub const WINSOR_LOWER: f64 = 0.05;

/// Upper quantile used for winsorisation.
pub const WINSOR_UPPER: f64 = 0.95;

/// Time-indexed table of historical shocks for one country.
///
/// Invariant: at least one row, every value finite, exactly six columns.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShockPanel {
    frequency: ShockFrequency,
    periods: Vec<String>,
    rows: Vec<[f64; N_SHOCK_VARIABLES]>,
}

impl ShockPanel {
    /// Creates a panel from period labels and observation rows.
    ///
    /// Period labels start with a four-digit year (`"2004"`, `"2004Q3"`).
    ///
    /// # Errors
    ///
    /// - `DataError::EmptyPanel` if there are no rows
    /// - `DataError::LengthMismatch` if labels and rows differ in length
    /// - `DataError::NonFinite` if any value is NaN or infinite
    pub fn new(
        frequency: ShockFrequency,
        periods: Vec<String>,
        rows: Vec<[f64; N_SHOCK_VARIABLES]>,
    ) -> Result<Self, DataError> {
        if rows.is_empty() {
            return Err(DataError::EmptyPanel);
        }
        if periods.len() != rows.len() {
            return Err(DataError::length_mismatch("periods", rows.len(), periods.len()));
        }
        for (i, row) in rows.iter().enumerate() {
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(DataError::non_finite(ShockVariable::ALL[j].column_name(), i));
            }
        }
        Ok(Self {
            frequency,
            periods,
            rows,
        })
    }

    /// Observation frequency.
    #[inline]
    pub fn frequency(&self) -> ShockFrequency {
        self.frequency
    }

    /// Number of observations.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false; panels are non-empty by construction.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Period labels in observation order.
    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    /// Observation rows.
    pub fn rows(&self) -> &[[f64; N_SHOCK_VARIABLES]] {
        &self.rows
    }

    /// Copies out one column.
    pub fn column(&self, variable: ShockVariable) -> Vec<f64> {
        let j = variable.index();
        self.rows.iter().map(|row| row[j]).collect()
    }

    /// Keeps only observations from `start_year` onwards.
    ///
    /// # Errors
    ///
    /// - `DataError::InvalidInput` if a period label has no leading year
    /// - `DataError::EmptyPanel` if nothing remains
    pub fn since_year(&self, start_year: i32) -> Result<Self, DataError> {
        let mut periods = Vec::new();
        let mut rows = Vec::new();
        for (label, row) in self.periods.iter().zip(&self.rows) {
            if period_year(label)? >= start_year {
                periods.push(label.clone());
                rows.push(*row);
            }
        }
        Self::new(self.frequency, periods, rows)
    }

    /// Clips every column to its own `[lower_q, upper_q]` quantile range.
    ///
    /// Quantiles use linear interpolation between order statistics.
    pub fn winsorized(&self, lower_q: f64, upper_q: f64) -> Self {
        let mut rows = self.rows.clone();
        for variable in ShockVariable::ALL {
            let column = self.column(variable);
            let lo = quantile(&column, lower_q);
            let hi = quantile(&column, upper_q);
            let j = variable.index();
            for row in rows.iter_mut() {
                row[j] = row[j].max(lo).min(hi);
            }
        }
        Self {
            frequency: self.frequency,
            periods: self.periods.clone(),
            rows,
        }
    }

    /// Returns a copy with the given columns set to zero.
    pub fn with_zeroed(&self, variables: &[ShockVariable]) -> Self {
        let mut rows = self.rows.clone();
        for row in rows.iter_mut() {
            for v in variables {
                row[v.index()] = 0.0;
            }
        }
        Self {
            frequency: self.frequency,
            periods: self.periods.clone(),
            rows,
        }
    }

    /// Sample covariance of the six columns (denominator `n - 1`).
    ///
    /// # Errors
    ///
    /// `EstimationError::InsufficientObservations` for a single-row panel.
    pub fn covariance(&self) -> Result<CovarianceMatrix, EstimationError> {
        let data: Vec<f64> = self.rows.iter().flat_map(|r| r.iter().copied()).collect();
        CovarianceMatrix::sample(&data, N_SHOCK_VARIABLES)
    }
}

fn period_year(label: &str) -> Result<i32, DataError> {
    label
        .get(..4)
        .and_then(|y| y.parse().ok())
        .ok_or_else(|| DataError::InvalidInput(format!("period label '{}' has no year", label)))
}

/// Quarterly and annual shock panels for one country.
///
/// Either panel may be missing. Quarterly requests fall back to annual
/// data when no quarterly observations exist.
#[derive(Clone, Debug, Default)]
pub struct PanelSource {
    /// Quarterly observations, if any.
    pub quarterly: Option<ShockPanel>,
    /// Annual observations, if any.
    pub annual: Option<ShockPanel>,
}

impl PanelSource {
    /// Creates a source from optional quarterly and annual panels.
    pub fn new(quarterly: Option<ShockPanel>, annual: Option<ShockPanel>) -> Self {
        Self { quarterly, annual }
    }

    /// Resolves the panel to sample from.
    ///
    /// Falls back from quarterly to annual data with a warning, restricts
    /// the sample to `sample_start` onwards and optionally winsorises it
    /// to the 5th–95th percentile range.
    ///
    /// # Errors
    ///
    /// `DataError::EmptyPanel` if no data exists at the resolved frequency
    /// or nothing remains after the start-year restriction.
    pub fn prepare(
        &self,
        requested: ShockFrequency,
        sample_start: i32,
        winsorize: bool,
    ) -> Result<ShockPanel, DataError> {
        let panel = match (requested, &self.quarterly) {
            (ShockFrequency::Quarterly, Some(q)) => q,
            (ShockFrequency::Quarterly, None) => {
                warn!("No quarterly shock data available, using annual data instead");
                self.annual.as_ref().ok_or(DataError::EmptyPanel)?
            }
            (ShockFrequency::Annual, _) => self.annual.as_ref().ok_or(DataError::EmptyPanel)?,
        };

        let panel = panel.since_year(sample_start)?;
        if winsorize {
            Ok(panel.winsorized(WINSOR_LOWER, WINSOR_UPPER))
        } else {
            Ok(panel)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn annual_panel() -> ShockPanel {
        let periods = (2000..2010).map(|y| y.to_string()).collect();
        let rows = (0..10)
            .map(|i| {
                let x = i as f64;
                [x, -x, 0.5 * x, 2.0 * x, 1.0, x * x]
            })
            .collect();
        ShockPanel::new(ShockFrequency::Annual, periods, rows).unwrap()
    }

    // ========================================
    // Construction Tests
    // ========================================

    #[test]
    fn test_empty_panel_rejected() {
        let result = ShockPanel::new(ShockFrequency::Annual, vec![], vec![]);
        assert_eq!(result, Err(DataError::EmptyPanel));
    }

    #[test]
    fn test_non_finite_rejected() {
        let result = ShockPanel::new(
            ShockFrequency::Annual,
            vec!["2000".into()],
            vec![[0.0, 0.0, f64::NAN, 0.0, 0.0, 0.0]],
        );
        assert!(matches!(result, Err(DataError::NonFinite { index: 0, .. })));
    }

    #[test]
    fn test_label_count_mismatch_rejected() {
        let result = ShockPanel::new(ShockFrequency::Annual, vec![], vec![[0.0; 6]]);
        assert!(matches!(result, Err(DataError::LengthMismatch { .. })));
    }

    // ========================================
    // Sample Restriction Tests
    // ========================================

    #[test]
    fn test_since_year_filters_rows() {
        let panel = annual_panel().since_year(2005).unwrap();
        assert_eq!(panel.len(), 5);
        assert_eq!(panel.periods()[0], "2005");
    }

    #[test]
    fn test_since_year_quarterly_labels() {
        let panel = ShockPanel::new(
            ShockFrequency::Quarterly,
            vec!["1999Q4".into(), "2000Q1".into()],
            vec![[1.0; 6], [2.0; 6]],
        )
        .unwrap();
        let restricted = panel.since_year(2000).unwrap();
        assert_eq!(restricted.len(), 1);
        assert_eq!(restricted.rows()[0], [2.0; 6]);
    }

    #[test]
    fn test_since_year_everything_dropped() {
        assert_eq!(annual_panel().since_year(2050), Err(DataError::EmptyPanel));
    }

    // ========================================
    // Winsorisation Tests
    // ========================================

    #[test]
    fn test_winsorized_clips_to_percentiles() {
        let panel = annual_panel().winsorized(0.05, 0.95);
        let col = panel.column(ShockVariable::ExrEur);
        // Linear quantiles of 0..=9 at 5% and 95%
        assert_relative_eq!(col[0], 0.45, epsilon = 1e-12);
        assert_relative_eq!(col[9], 8.55, epsilon = 1e-12);
        assert_relative_eq!(col[5], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_winsorized_constant_column_unchanged() {
        let panel = annual_panel().winsorized(0.05, 0.95);
        assert!(panel
            .column(ShockVariable::NominalGdpGrowth)
            .iter()
            .all(|&v| v == 1.0));
    }

    // ========================================
    // Frequency Fallback Tests
    // ========================================

    #[test]
    fn test_prepare_falls_back_to_annual() {
        let source = PanelSource::new(None, Some(annual_panel()));
        let panel = source.prepare(ShockFrequency::Quarterly, 2000, false).unwrap();
        assert_eq!(panel.frequency(), ShockFrequency::Annual);
        assert_eq!(panel.len(), 10);
    }

    #[test]
    fn test_prepare_without_any_data() {
        let source = PanelSource::default();
        assert_eq!(
            source.prepare(ShockFrequency::Quarterly, 2000, true),
            Err(DataError::EmptyPanel)
        );
    }

    #[test]
    fn test_with_zeroed_columns() {
        let panel = annual_panel().with_zeroed(&[ShockVariable::ExrEur, ShockVariable::PrimaryBalance]);
        assert!(panel.column(ShockVariable::ExrEur).iter().all(|&v| v == 0.0));
        assert!(panel.column(ShockVariable::PrimaryBalance).iter().all(|&v| v == 0.0));
        assert_eq!(panel.column(ShockVariable::NominalGdpGrowth)[0], 1.0);
    }

    #[test]
    fn test_covariance_of_constant_column_is_zero() {
        let cov = annual_panel().covariance().unwrap();
        let g = ShockVariable::NominalGdpGrowth.index();
        for j in 0..N_SHOCK_VARIABLES {
            assert_eq!(cov.get(g, j), 0.0);
        }
    }
}
