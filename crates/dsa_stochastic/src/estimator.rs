//! Estimation of the joint shock distribution.
//!
//! Two model families are fitted from a historical [`ShockPanel`]:
//!
//! - **Normal**: the sample covariance (denominator `n − 1`) of all six
//!   variables, sampled through a PSD square-root factor
//! - **VAR(1)**: `y[t] = c + A · y[t−1] + e[t]` estimated by least squares
//!   on the columns that apply to the currency regime, with residuals
//!   either resampled or drawn through the Cholesky factor of their
//!   covariance

use dsa_core::math::linalg::{least_squares, CovarianceMatrix, MatrixFactor};
use dsa_core::types::{EstimationError, ShockPanel, ShockVariable, N_SHOCK_VARIABLES};
use tracing::debug;

use crate::request::{CurrencyRegime, EstimationMode};

/// Multivariate normal shock model.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalModel {
    covariance: CovarianceMatrix,
    factor: MatrixFactor,
}

impl NormalModel {
    /// Builds the model from a covariance matrix.
    pub fn new(covariance: CovarianceMatrix) -> Self {
        let factor = covariance.psd_factor();
        Self { covariance, factor }
    }

    /// Covariance of the six shock variables.
    pub fn covariance(&self) -> &CovarianceMatrix {
        &self.covariance
    }

    /// Square-root factor used for sampling.
    pub fn factor(&self) -> &MatrixFactor {
        &self.factor
    }
}

/// Fitted order-1 vector autoregression.
///
/// Coefficients are stored row-major: `coefficients[i * k + j]` is the
/// effect of variable `j` at `t − 1` on variable `i` at `t`.
#[derive(Clone, Debug, PartialEq)]
pub struct VarModel {
    columns: Vec<ShockVariable>,
    intercept: Vec<f64>,
    coefficients: Vec<f64>,
    residuals: Vec<f64>,
}

impl VarModel {
    /// Fits the VAR by least squares on the given columns of the panel.
    ///
    /// # Errors
    ///
    /// - `EstimationError::InsufficientObservations` unless the panel has
    ///   more than `k + 2` rows
    /// - `EstimationError::SingularRegressors` if the lagged regressors are
    ///   collinear
    pub fn fit(panel: &ShockPanel, columns: &[ShockVariable]) -> Result<Self, EstimationError> {
        let k = columns.len();
        let t = panel.len();
        // One lag consumed; the regression needs more rows than regressors.
        let n_obs = t.saturating_sub(1);
        if n_obs <= k + 1 {
            return Err(EstimationError::InsufficientObservations {
                got: t,
                need: k + 3,
            });
        }

        let series: Vec<Vec<f64>> = columns.iter().map(|&v| panel.column(v)).collect();

        let mut x = Vec::with_capacity(n_obs * (k + 1));
        let mut y = Vec::with_capacity(n_obs * k);
        for row in 1..t {
            x.push(1.0);
            x.extend(series.iter().map(|s| s[row - 1]));
            y.extend(series.iter().map(|s| s[row]));
        }

        let b = least_squares(&x, &y, n_obs, k + 1, k)?;

        let intercept = b[..k].to_vec();
        let mut coefficients = vec![0.0; k * k];
        for i in 0..k {
            for j in 0..k {
                coefficients[i * k + j] = b[(1 + j) * k + i];
            }
        }

        let mut residuals = Vec::with_capacity(n_obs * k);
        for obs in 0..n_obs {
            let lagged = &x[obs * (k + 1) + 1..(obs + 1) * (k + 1)];
            for i in 0..k {
                let fitted = intercept[i]
                    + (0..k)
                        .map(|j| coefficients[i * k + j] * lagged[j])
                        .sum::<f64>();
                residuals.push(y[obs * k + i] - fitted);
            }
        }

        Ok(Self {
            columns: columns.to_vec(),
            intercept,
            coefficients,
            residuals,
        })
    }

    /// Shock variables in model column order.
    pub fn columns(&self) -> &[ShockVariable] {
        &self.columns
    }

    /// Number of modelled variables.
    #[inline]
    pub fn dim(&self) -> usize {
        self.columns.len()
    }

    /// Intercept vector.
    pub fn intercept(&self) -> &[f64] {
        &self.intercept
    }

    /// Lag coefficient matrix (row-major).
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Residual rows (row-major, one row per regression observation).
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Number of residual rows.
    #[inline]
    pub fn n_residuals(&self) -> usize {
        self.residuals.len() / self.dim()
    }

    /// Residual row `i`.
    #[inline]
    pub fn residual(&self, i: usize) -> &[f64] {
        let k = self.dim();
        &self.residuals[i * k..(i + 1) * k]
    }

    /// Model column of a shock variable, if modelled.
    pub fn position(&self, variable: ShockVariable) -> Option<usize> {
        self.columns.iter().position(|&v| v == variable)
    }

    /// Copy with the primary-balance intercept and the primary-balance row
    /// and column of the lag matrix set to zero.
    pub fn without_primary_balance(&self) -> Self {
        let mut model = self.clone();
        if let Some(p) = self.position(ShockVariable::PrimaryBalance) {
            let k = self.dim();
            model.intercept[p] = 0.0;
            for j in 0..k {
                model.coefficients[p * k + j] = 0.0;
                model.coefficients[j * k + p] = 0.0;
            }
        }
        model
    }

    /// One recursion step: `c + A · previous + residual`.
    ///
    /// `previous = None` starts the recursion (`c + residual`).
    pub fn step(&self, previous: Option<&[f64]>, residual: &[f64], out: &mut [f64]) {
        let k = self.dim();
        for i in 0..k {
            let mut value = self.intercept[i];
            if let Some(prev) = previous {
                let row = &self.coefficients[i * k..(i + 1) * k];
                value += row.iter().zip(prev).map(|(a, y)| a * y).sum::<f64>();
            }
            out[i] = value + residual[i];
        }
    }

    /// Cholesky factor of the residual covariance (denominator `n − 1`).
    ///
    /// # Errors
    ///
    /// `EstimationError::NotPositiveDefinite` for a singular residual
    /// covariance.
    pub fn residual_cholesky(&self) -> Result<MatrixFactor, EstimationError> {
        CovarianceMatrix::sample(&self.residuals, self.dim())?.cholesky()
    }
}

/// How VAR residuals are drawn.
#[derive(Clone, Debug, PartialEq)]
pub enum ResidualDraw {
    /// Uniform resampling of residual rows with replacement.
    Bootstrap,
    /// Independent normals correlated through the residual Cholesky factor.
    Cholesky(MatrixFactor),
}

/// Fitted joint shock distribution.
#[derive(Clone, Debug, PartialEq)]
pub enum FittedShockModel {
    /// Multivariate normal over all six variables.
    Normal(NormalModel),
    /// VAR(1) over the columns applicable to the currency regime.
    Var {
        /// Fitted autoregression
        model: VarModel,
        /// Residual generator
        residual_draw: ResidualDraw,
    },
}

/// Fits a shock model for the given mode and currency regime.
///
/// The regime only matters for VAR modes: the inapplicable exchange-rate
/// column is excluded from estimation.
///
/// # Errors
///
/// Any `EstimationError`; estimation failures are fatal for the country.
pub fn fit(
    panel: &ShockPanel,
    mode: EstimationMode,
    regime: CurrencyRegime,
) -> Result<FittedShockModel, EstimationError> {
    match mode {
        EstimationMode::Normal => {
            let covariance = panel.covariance()?;
            debug!(observations = panel.len(), "fitted normal shock model");
            Ok(FittedShockModel::Normal(NormalModel::new(covariance)))
        }
        EstimationMode::VarBootstrap | EstimationMode::VarCholesky => {
            let dropped = regime.dropped_variable();
            let columns: Vec<ShockVariable> = ShockVariable::ALL
                .into_iter()
                .filter(|v| Some(*v) != dropped)
                .collect();
            let model = VarModel::fit(panel, &columns)?;
            let residual_draw = if mode == EstimationMode::VarCholesky {
                ResidualDraw::Cholesky(model.residual_cholesky()?)
            } else {
                ResidualDraw::Bootstrap
            };
            debug!(
                observations = panel.len(),
                variables = model.dim(),
                mode = %mode,
                "fitted VAR(1) shock model"
            );
            Ok(FittedShockModel::Var {
                model,
                residual_draw,
            })
        }
    }
}

impl FittedShockModel {
    /// Variables that receive non-zero draws.
    pub fn populated(&self) -> [bool; N_SHOCK_VARIABLES] {
        match self {
            FittedShockModel::Normal(_) => [true; N_SHOCK_VARIABLES],
            FittedShockModel::Var { model, .. } => {
                let mut mask = [false; N_SHOCK_VARIABLES];
                for v in model.columns() {
                    mask[v.index()] = true;
                }
                mask
            }
        }
    }
}
