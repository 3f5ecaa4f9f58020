//! Brent's bounded scalar minimiser.

use super::MinimiserConfig;
use crate::types::SolverError;

/// Outcome of a bounded minimisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimiseResult {
    /// Best point found.
    pub x: f64,
    /// Objective value at `x`.
    pub fun: f64,
    /// Number of objective evaluations.
    pub iterations: usize,
    /// Whether the location tolerance was met within the budget.
    pub converged: bool,
}

/// Brent's method for minimising a scalar function on a closed interval.
///
/// Alternates golden-section steps with parabolic interpolation through
/// the three best points. No derivatives are needed and the objective is
/// only ever evaluated strictly inside the bounds.
///
/// Termination follows the classic bounded formulation: the search stops
/// once the current best point lies within `2·tol1 − (b − a)/2` of the
/// bracket midpoint, where `tol1 = √ε·|x| + tolerance/3`.
///
/// # Example
///
/// ```
/// use dsa_core::math::solvers::{BoundedBrentMinimiser, MinimiserConfig};
///
/// let minimiser = BoundedBrentMinimiser::new(MinimiserConfig::default());
///
/// // Minimum of |x − 0.25| on [−5, 5]
/// let result = minimiser.minimise(|x| (x - 0.25).abs(), -5.0, 5.0).unwrap();
/// assert!((result.x - 0.25).abs() < 1e-4);
/// ```
#[derive(Debug, Clone)]
pub struct BoundedBrentMinimiser {
    config: MinimiserConfig,
}

impl BoundedBrentMinimiser {
    /// Create a minimiser with the given configuration.
    pub fn new(config: MinimiserConfig) -> Self {
        Self { config }
    }

    /// Create a minimiser with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(MinimiserConfig::default())
    }

    /// Configuration in use.
    pub fn config(&self) -> &MinimiserConfig {
        &self.config
    }

    /// Minimise an infallible objective on `[lower, upper]`.
    ///
    /// # Errors
    ///
    /// - `SolverError::InvalidBounds` unless `lower < upper`
    /// - `SolverError::NonFiniteObjective` if the objective returns NaN
    pub fn minimise<F>(&self, mut f: F, lower: f64, upper: f64) -> Result<MinimiseResult, SolverError>
    where
        F: FnMut(f64) -> f64,
    {
        self.try_minimise(|x| Ok::<f64, SolverError>(f(x)), lower, upper)
    }

    /// Minimise a fallible objective on `[lower, upper]`.
    ///
    /// The first objective error aborts the search and is returned as is.
    ///
    /// # Errors
    ///
    /// Objective errors, plus the solver errors of [`Self::minimise`]
    /// converted into `E`.
    pub fn try_minimise<F, E>(&self, mut f: F, lower: f64, upper: f64) -> Result<MinimiseResult, E>
    where
        F: FnMut(f64) -> Result<f64, E>,
        E: From<SolverError>,
    {
        if lower >= upper || !lower.is_finite() || !upper.is_finite() {
            return Err(SolverError::InvalidBounds { lower, upper }.into());
        }

        let sqrt_eps = f64::EPSILON.sqrt();
        let golden_mean = 0.5 * (3.0 - 5.0_f64.sqrt());
        let xatol = self.config.tolerance;
        let max_evals = self.config.max_iterations;

        let mut eval = |x: f64| -> Result<f64, E> {
            let fx = f(x)?;
            if fx.is_nan() {
                return Err(SolverError::NonFiniteObjective { x }.into());
            }
            Ok(fx)
        };

        let (mut a, mut b) = (lower, upper);
        let mut fulc = a + golden_mean * (b - a);
        let mut nfc = fulc;
        let mut xf = fulc;
        let mut rat: f64 = 0.0;
        let mut e: f64 = 0.0;

        let mut fx = eval(xf)?;
        let mut evals = 1;
        let mut ffulc = fx;
        let mut fnfc = fx;

        let mut xm = 0.5 * (a + b);
        let mut tol1 = sqrt_eps * xf.abs() + xatol / 3.0;
        let mut tol2 = 2.0 * tol1;
        let mut converged = true;

        while (xf - xm).abs() > tol2 - 0.5 * (b - a) {
            let mut golden = true;

            if e.abs() > tol1 {
                golden = false;
                let mut r = (xf - nfc) * (fx - ffulc);
                let mut q = (xf - fulc) * (fx - fnfc);
                let mut p = (xf - fulc) * q - (xf - nfc) * r;
                q = 2.0 * (q - r);
                if q > 0.0 {
                    p = -p;
                }
                q = q.abs();
                r = e;
                e = rat;

                if p.abs() < (0.5 * q * r).abs() && p > q * (a - xf) && p < q * (b - xf) {
                    // Parabolic step
                    rat = p / q;
                    let x = xf + rat;
                    if (x - a) < tol2 || (b - x) < tol2 {
                        rat = tol1 * sign_or_one(xm - xf);
                    }
                } else {
                    golden = true;
                }
            }

            if golden {
                e = if xf >= xm { a - xf } else { b - xf };
                rat = golden_mean * e;
            }

            let x = xf + sign_or_one(rat) * rat.abs().max(tol1);
            let fu = eval(x)?;
            evals += 1;

            if fu <= fx {
                if x >= xf {
                    a = xf;
                } else {
                    b = xf;
                }
                fulc = nfc;
                ffulc = fnfc;
                nfc = xf;
                fnfc = fx;
                xf = x;
                fx = fu;
            } else {
                if x < xf {
                    a = x;
                } else {
                    b = x;
                }
                if fu <= fnfc || nfc == xf {
                    fulc = nfc;
                    ffulc = fnfc;
                    nfc = x;
                    fnfc = fu;
                } else if fu <= ffulc || fulc == xf || fulc == nfc {
                    fulc = x;
                    ffulc = fu;
                }
            }

            xm = 0.5 * (a + b);
            tol1 = sqrt_eps * xf.abs() + xatol / 3.0;
            tol2 = 2.0 * tol1;

            if evals >= max_evals {
                converged = false;
                break;
            }
        }

        Ok(MinimiseResult {
            x: xf,
            fun: fx,
            iterations: evals,
            converged,
        })
    }
}

/// Sign of `v`, with zero mapped to +1.
#[inline]
fn sign_or_one(v: f64) -> f64 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}
