//! Raw shock sampling.
//!
//! Draws `n_paths × steps` six-variable shock vectors from a
//! [`FittedShockModel`]. Draws are generated path by path, then step by
//! step, from a single generator so that a seed reproduces the ensemble
//! exactly.
//!
//! The primary-balance shock is suppressed for the first `pb_zero_steps`
//! steps of every path. Under a VAR model this also removes the
//! primary-balance intercept and every lag coefficient into or out of the
//! primary balance for those steps.

use dsa_core::rng::DsaRng;
use dsa_core::types::{ShockFrequency, ShockVariable, N_SHOCK_VARIABLES};

use crate::estimator::{FittedShockModel, NormalModel, ResidualDraw, VarModel};

/// Raw draws at the native sampling frequency.
///
/// Layout is `[path][step][variable]`, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct ShockEnsemble {
    n_paths: usize,
    steps: usize,
    frequency: ShockFrequency,
    populated: [bool; N_SHOCK_VARIABLES],
    data: Vec<f64>,
}

impl ShockEnsemble {
    /// All-zero ensemble.
    pub fn zeros(n_paths: usize, steps: usize, frequency: ShockFrequency) -> Self {
        Self {
            n_paths,
            steps,
            frequency,
            populated: [true; N_SHOCK_VARIABLES],
            data: vec![0.0; n_paths * steps * N_SHOCK_VARIABLES],
        }
    }

    /// Number of paths.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Draw steps per path.
    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Sampling frequency of the draws.
    #[inline]
    pub fn frequency(&self) -> ShockFrequency {
        self.frequency
    }

    /// Whether a variable received draws (false for the column a VAR excluded).
    #[inline]
    pub fn is_populated(&self, variable: ShockVariable) -> bool {
        self.populated[variable.index()]
    }

    /// Single draw.
    #[inline]
    pub fn get(&self, path: usize, step: usize, variable: ShockVariable) -> f64 {
        self.data[self.offset(path, step) + variable.index()]
    }

    /// Overwrite a single draw.
    #[inline]
    pub fn set(&mut self, path: usize, step: usize, variable: ShockVariable, value: f64) {
        let offset = self.offset(path, step);
        self.data[offset + variable.index()] = value;
    }

    /// Shock vector of one path at one step.
    #[inline]
    pub fn vector(&self, path: usize, step: usize) -> &[f64] {
        let offset = self.offset(path, step);
        &self.data[offset..offset + N_SHOCK_VARIABLES]
    }

    /// All draws of one path, `steps × 6`.
    #[inline]
    pub fn path(&self, path: usize) -> &[f64] {
        let width = self.steps * N_SHOCK_VARIABLES;
        &self.data[path * width..(path + 1) * width]
    }

    #[inline]
    fn offset(&self, path: usize, step: usize) -> usize {
        (path * self.steps + step) * N_SHOCK_VARIABLES
    }
}

/// Draws raw shocks from a fitted model.
///
/// # Arguments
///
/// * `model` - Fitted shock distribution
/// * `n_paths` - Number of paths
/// * `steps` - Draw steps per path
/// * `pb_zero_steps` - Leading steps with the primary-balance shock zeroed
/// * `frequency` - Frequency of the draws, recorded on the ensemble
/// * `rng` - Random source
pub fn sample(
    model: &FittedShockModel,
    n_paths: usize,
    steps: usize,
    pb_zero_steps: usize,
    frequency: ShockFrequency,
    rng: &mut DsaRng,
) -> ShockEnsemble {
    let mut ensemble = ShockEnsemble::zeros(n_paths, steps, frequency);
    ensemble.populated = model.populated();

    match model {
        FittedShockModel::Normal(normal) => {
            sample_normal(normal, pb_zero_steps, &mut ensemble, rng);
        }
        FittedShockModel::Var {
            model,
            residual_draw,
        } => {
            sample_var(model, residual_draw, pb_zero_steps, &mut ensemble, rng);
        }
    }
    ensemble
}

fn sample_normal(
    model: &NormalModel,
    pb_zero_steps: usize,
    ensemble: &mut ShockEnsemble,
    rng: &mut DsaRng,
) {
    let factor = model.factor();
    let pb = ShockVariable::PrimaryBalance.index();
    let mut z = [0.0; N_SHOCK_VARIABLES];
    let steps = ensemble.steps;

    for (i, row) in ensemble.data.chunks_exact_mut(N_SHOCK_VARIABLES).enumerate() {
        rng.fill_normal(&mut z);
        factor.transform_into(&z, row);
        if i % steps < pb_zero_steps {
            row[pb] = 0.0;
        }
    }
}

fn sample_var(
    model: &VarModel,
    residual_draw: &ResidualDraw,
    pb_zero_steps: usize,
    ensemble: &mut ShockEnsemble,
    rng: &mut DsaRng,
) {
    let k = model.dim();
    let restricted = model.without_primary_balance();
    let pb_column = model.position(ShockVariable::PrimaryBalance);
    let targets: Vec<usize> = model.columns().iter().map(|v| v.index()).collect();

    let mut z = vec![0.0; k];
    let mut residual = vec![0.0; k];
    let mut previous = vec![0.0; k];
    let mut current = vec![0.0; k];

    for path in 0..ensemble.n_paths {
        for step in 0..ensemble.steps {
            match residual_draw {
                ResidualDraw::Bootstrap => {
                    let row = rng.gen_index(model.n_residuals());
                    residual.copy_from_slice(model.residual(row));
                }
                ResidualDraw::Cholesky(factor) => {
                    rng.fill_normal(&mut z);
                    factor.transform_into(&z, &mut residual);
                }
            }

            let active = if step < pb_zero_steps {
                if let Some(p) = pb_column {
                    residual[p] = 0.0;
                }
                &restricted
            } else {
                model
            };

            let lagged = (step > 0).then_some(previous.as_slice());
            active.step(lagged, &residual, &mut current);

            let offset = ensemble.offset(path, step);
            for (j, &target) in targets.iter().enumerate() {
                ensemble.data[offset + target] = current[j];
            }
            std::mem::swap(&mut previous, &mut current);
        }
    }
}
