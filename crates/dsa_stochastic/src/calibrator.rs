//! Stochastic calibration of the policy lever.
//!
//! Finds the structural primary balance `x` in `[lower, upper]` at which the
//! largest selected risk probability meets a target confidence level. The
//! shock ensemble is drawn once; every trial re-projects the baseline at
//! `x`, recombines the same shocks with it and re-simulates debt, so the
//! objective is deterministic in `x`.
//!
//! # Objective
//!
//! ```text
//! f(x) = |max_c P_c(x) − target| + penalty(x)
//! penalty(x) = max(0, x / 10)   if max_c P_c(x) is close to 0 or 1
//!              0                otherwise
//! ```
//!
//! The penalty steers the search away from the flat regions where every
//! path satisfies (or fails) the criteria.

use std::time::{Duration, Instant};

use dsa_core::math::solvers::{BoundedBrentMinimiser, MinimiserConfig};
use dsa_core::types::{BaselinePaths, ShockPanel};
use tracing::{debug, info, instrument, warn};

use crate::aggregator::AnnualShockEnsemble;
use crate::engine::{draw_annual_shocks, simulate_paths, SimulationResult};
use crate::error::{ProjectionError, RequestError, StochasticError};
use crate::request::SimulationRequest;
use crate::risk::{RiskCriterion, RiskEstimator, RiskProbabilities};
use crate::simulator::SimulatedPathSet;

/// Default search interval for the policy lever.
pub const DEFAULT_BOUNDS: (f64, f64) = (-5.0, 5.0);

/// Default target probability.
pub const DEFAULT_TARGET: f64 = 0.7;

/// Default number of points in an objective profile.
pub const DEFAULT_PROFILE_POINTS: usize = 100;

/// Deterministic baseline projection engine.
///
/// `policy = None` projects without a policy target; `Some(x)` projects
/// with the structural primary balance target `x`.
pub trait BaselineProjector {
    /// Projects the baseline for a policy value.
    fn project(&mut self, policy: Option<f64>) -> Result<BaselinePaths, ProjectionError>;
}

impl<F> BaselineProjector for F
where
    F: FnMut(Option<f64>) -> Result<BaselinePaths, ProjectionError>,
{
    fn project(&mut self, policy: Option<f64>) -> Result<BaselinePaths, ProjectionError> {
        self(policy)
    }
}

/// Calibration configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationConfig {
    /// Search interval `(lower, upper)`.
    pub bounds: (f64, f64),
    /// Target probability in `[0, 1]`.
    pub target: f64,
    /// Criteria whose maximum is matched to the target.
    pub criteria: Vec<RiskCriterion>,
    /// Reference column of the declines criterion.
    pub criterion_start: usize,
    /// Minimiser settings.
    pub minimiser: MinimiserConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            bounds: DEFAULT_BOUNDS,
            target: DEFAULT_TARGET,
            criteria: vec![RiskCriterion::Declines, RiskCriterion::Below60],
            criterion_start: 0,
            minimiser: MinimiserConfig::default(),
        }
    }
}

impl CalibrationConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> CalibrationConfigBuilder {
        CalibrationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// - `RequestError::NoCriteria` for an empty criteria list
    /// - `RequestError::InvalidParameter` for a target outside `[0, 1]` or
    ///   bounds that are not finite and ordered
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.criteria.is_empty() {
            return Err(RequestError::NoCriteria);
        }
        if !(0.0..=1.0).contains(&self.target) {
            return Err(RequestError::invalid(
                "target",
                format!("must lie in [0, 1], got {}", self.target),
            ));
        }
        let (lower, upper) = self.bounds;
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(RequestError::invalid(
                "bounds",
                format!("expected finite lower < upper, got ({}, {})", lower, upper),
            ));
        }
        Ok(())
    }

    fn risk_estimator(&self) -> RiskEstimator {
        RiskEstimator::new(self.criteria.clone(), self.criterion_start)
    }
}

/// Builder for [`CalibrationConfig`].
#[derive(Clone, Debug)]
pub struct CalibrationConfigBuilder {
    config: CalibrationConfig,
}

impl CalibrationConfigBuilder {
    /// Set the search interval.
    pub fn bounds(mut self, lower: f64, upper: f64) -> Self {
        self.config.bounds = (lower, upper);
        self
    }

    /// Set the target probability.
    pub fn target(mut self, target: f64) -> Self {
        self.config.target = target;
        self
    }

    /// Set the criteria.
    pub fn criteria(mut self, criteria: Vec<RiskCriterion>) -> Self {
        self.config.criteria = criteria;
        self
    }

    /// Set the reference column of the declines criterion.
    pub fn criterion_start(mut self, column: usize) -> Self {
        self.config.criterion_start = column;
        self
    }

    /// Set the minimiser configuration.
    pub fn minimiser(mut self, minimiser: MinimiserConfig) -> Self {
        self.config.minimiser = minimiser;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<CalibrationConfig, RequestError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// One objective evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrialRecord {
    /// Policy value.
    pub policy: f64,
    /// Risk probabilities at `policy`.
    pub probabilities: RiskProbabilities,
    /// Objective value.
    pub objective: f64,
}

/// Trials in evaluation order.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimisationTrace {
    trials: Vec<TrialRecord>,
}

impl OptimisationTrace {
    /// Recorded trials.
    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    /// Number of trials.
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// True when nothing was evaluated.
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Trial with the lowest objective; the first one wins ties.
    pub fn best(&self) -> Option<&TrialRecord> {
        self.trials.iter().reduce(|best, t| {
            if t.objective < best.objective {
                t
            } else {
                best
            }
        })
    }

    fn push(&mut self, record: TrialRecord) {
        self.trials.push(record);
    }
}

/// Calibration diagnostics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibrationDiagnostics {
    /// Objective evaluations performed by the minimiser.
    pub iterations: usize,
    /// Wall-clock time of the whole calibration.
    pub duration: Duration,
}

/// Outcome of a stochastic calibration.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationResult {
    /// Calibrated policy value.
    pub policy: f64,
    /// Whether the minimiser met its tolerance within the budget.
    pub converged: bool,
    /// Objective at `policy`.
    pub objective: f64,
    /// Risk probabilities at `policy`.
    pub probabilities: RiskProbabilities,
    /// Every objective evaluation.
    pub trace: OptimisationTrace,
    /// Baseline projected at `policy`.
    pub baseline: BaselinePaths,
    /// Simulation at `policy`.
    pub simulation: SimulationResult,
    /// Diagnostics.
    pub diagnostics: CalibrationDiagnostics,
}

/// One point of an objective profile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProfilePoint {
    /// Policy value.
    pub policy: f64,
    /// Objective at `policy`.
    pub objective: f64,
}

/// Penalised distance between the achieved probability and the target.
///
/// `None` (no criterion evaluated) is never produced by a validated
/// configuration and maps to an infinite objective.
pub fn objective_value(max_prob: Option<f64>, target: f64, policy: f64) -> f64 {
    let Some(p) = max_prob else {
        return f64::INFINITY;
    };
    let penalty = if is_close(p, 0.0) || is_close(p, 1.0) {
        (policy / 10.0).max(0.0)
    } else {
        0.0
    };
    (p - target).abs() + penalty
}

/// Closeness test with absolute tolerance 1e-8 and relative tolerance 1e-5
/// measured against `b`.
#[inline]
fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

/// Calibrates the policy lever against stochastic risk criteria.
///
/// # Example
///
/// ```
/// use dsa_stochastic::{CalibrationConfig, RiskCriterion, StochasticCalibrator};
///
/// let config = CalibrationConfig::builder()
///     .criteria(vec![RiskCriterion::Below60])
///     .target(0.8)
///     .build()
///     .unwrap();
/// let calibrator = StochasticCalibrator::new(config);
/// assert_eq!(calibrator.config().target, 0.8);
/// ```
#[derive(Clone, Debug)]
pub struct StochasticCalibrator {
    config: CalibrationConfig,
}

impl StochasticCalibrator {
    /// Create a calibrator.
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// Create a calibrator with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CalibrationConfig::default())
    }

    /// Configuration in use.
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Runs a full calibration.
    ///
    /// Projects the baseline without a policy and checks the stochastic
    /// window against it, draws the shock ensemble once, then minimises the objective over the configured bounds and
    /// re-projects at the optimum.
    ///
    /// # Errors
    ///
    /// - `StochasticError::Request` for an invalid configuration, before
    ///   any projection
    /// - `StochasticError::Request` if the stochastic window runs past the
    ///   projected baseline, before the shock model is fitted
    /// - `StochasticError::Estimation` if the shock model cannot be fitted
    /// - `StochasticError::Projection` if the projector fails
    /// - `StochasticError::Solver` for a NaN objective
    #[instrument(skip_all, fields(target = self.config.target, n_paths = request.n_paths()))]
    pub fn calibrate<P: BaselineProjector>(
        &self,
        projector: &mut P,
        request: &SimulationRequest,
        panel: &ShockPanel,
    ) -> Result<CalibrationResult, StochasticError> {
        self.config.validate()?;
        request.validate()?;

        let warm_up = projector.project(None)?;
        request.check_window(warm_up.len())?;
        let (seed, annual) = draw_annual_shocks(request, panel)?;
        debug!(seed, "drew calibration ensemble");

        self.calibrate_ensemble(projector, request, seed, annual)
    }

    /// Calibrates against an already drawn annual ensemble.
    ///
    /// # Errors
    ///
    /// As [`Self::calibrate`], without estimation errors.
    pub fn calibrate_ensemble<P: BaselineProjector>(
        &self,
        projector: &mut P,
        request: &SimulationRequest,
        seed: u64,
        annual: AnnualShockEnsemble,
    ) -> Result<CalibrationResult, StochasticError> {
        self.config.validate()?;
        let start = Instant::now();
        let estimator = self.config.risk_estimator();
        let mut trace = OptimisationTrace::default();

        let minimiser = BoundedBrentMinimiser::new(self.config.minimiser);
        let (lower, upper) = self.config.bounds;
        let outcome = minimiser.try_minimise(
            |x| {
                let (probabilities, objective) =
                    self.evaluate(projector, request, &annual, &estimator, x)?;
                debug!(
                    policy = x,
                    objective,
                    declines = ?probabilities.declines,
                    stable = ?probabilities.stable,
                    below_60 = ?probabilities.below_60,
                    "calibration trial"
                );
                trace.push(TrialRecord {
                    policy: x,
                    probabilities,
                    objective,
                });
                Ok::<f64, StochasticError>(objective)
            },
            lower,
            upper,
        )?;

        if !outcome.converged {
            warn!(
                policy = outcome.x,
                iterations = outcome.iterations,
                "calibration did not converge, returning best estimate"
            );
        }

        let baseline = projector.project(Some(outcome.x))?;
        let paths = simulate_paths(request, &annual, &baseline)?;
        let probabilities = estimator.evaluate(&paths.debt)?;
        let objective = objective_value(probabilities.max_selected(), self.config.target, outcome.x);

        info!(
            policy = outcome.x,
            objective,
            converged = outcome.converged,
            trials = trace.len(),
            "calibration complete"
        );

        Ok(CalibrationResult {
            policy: outcome.x,
            converged: outcome.converged,
            objective,
            probabilities,
            trace,
            baseline,
            simulation: SimulationResult {
                seed,
                annual,
                paths,
            },
            diagnostics: CalibrationDiagnostics {
                iterations: outcome.iterations,
                duration: start.elapsed(),
            },
        })
    }

    /// Evaluates the objective on `points` evenly spaced values over the
    /// bounds, endpoints included.
    ///
    /// # Errors
    ///
    /// Projection, request or configuration errors.
    pub fn objective_profile<P: BaselineProjector>(
        &self,
        projector: &mut P,
        request: &SimulationRequest,
        annual: &AnnualShockEnsemble,
        points: usize,
    ) -> Result<Vec<ProfilePoint>, StochasticError> {
        self.config.validate()?;
        let estimator = self.config.risk_estimator();
        let (lower, upper) = self.config.bounds;

        linspace(lower, upper, points)
            .map(|x| {
                let (_, objective) = self.evaluate(projector, request, annual, &estimator, x)?;
                Ok(ProfilePoint {
                    policy: x,
                    objective,
                })
            })
            .collect()
    }

    fn evaluate<P: BaselineProjector>(
        &self,
        projector: &mut P,
        request: &SimulationRequest,
        annual: &AnnualShockEnsemble,
        estimator: &RiskEstimator,
        x: f64,
    ) -> Result<(RiskProbabilities, f64), StochasticError> {
        let baseline = projector.project(Some(x))?;
        let paths: SimulatedPathSet = simulate_paths(request, annual, &baseline)?;
        let probabilities = estimator.evaluate(&paths.debt)?;
        let objective = objective_value(probabilities.max_selected(), self.config.target, x);
        Ok((probabilities, objective))
    }
}

/// `n` evenly spaced values from `a` to `b` inclusive.
fn linspace(a: f64, b: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 { (b - a) / (n - 1) as f64 } else { 0.0 };
    (0..n).map(move |i| if i + 1 == n && n > 1 { b } else { a + step * i as f64 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // ========================================
    // Objective Tests
    // ========================================

    #[test]
    fn test_objective_distance() {
        assert_abs_diff_eq!(objective_value(Some(0.5), 0.7, 3.0), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_objective_penalty_at_extremes() {
        assert_abs_diff_eq!(objective_value(Some(1.0), 0.7, 3.0), 0.3 + 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(objective_value(Some(0.0), 0.7, 2.0), 0.7 + 0.2, epsilon = 1e-12);
        // Negative policy: penalty floored at zero.
        assert_abs_diff_eq!(objective_value(Some(0.0), 0.7, -2.0), 0.7, epsilon = 1e-12);
        assert_eq!(objective_value(None, 0.7, 0.0), f64::INFINITY);
    }

    #[test]
    fn test_is_close_tolerances() {
        assert!(is_close(1e-9, 0.0));
        assert!(!is_close(1e-7, 0.0));
        assert!(is_close(1.0 - 5e-6, 1.0));
        assert!(!is_close(0.9999, 1.0));
    }

    #[test]
    fn test_linspace_endpoints() {
        let v: Vec<f64> = linspace(-5.0, 5.0, 100).collect();
        assert_eq!(v.len(), 100);
        assert_eq!(v[0], -5.0);
        assert_eq!(v[99], 5.0);
        assert_eq!(linspace(1.0, 2.0, 1).collect::<Vec<_>>(), vec![1.0]);
        assert_eq!(linspace(1.0, 2.0, 0).count(), 0);
    }

    // ========================================
    // Configuration Tests
    // ========================================

    #[test]
    fn test_config_defaults() {
        let config = CalibrationConfig::default();
        assert_eq!(config.bounds, (-5.0, 5.0));
        assert_eq!(config.target, 0.7);
        assert_eq!(
            config.criteria,
            vec![RiskCriterion::Declines, RiskCriterion::Below60]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(
            CalibrationConfig::builder().criteria(vec![]).build(),
            Err(RequestError::NoCriteria)
        );
        assert!(CalibrationConfig::builder().target(1.5).build().is_err());
        assert!(CalibrationConfig::builder().bounds(2.0, 2.0).build().is_err());
        assert!(CalibrationConfig::builder().bounds(f64::NAN, 2.0).build().is_err());
    }

    #[test]
    fn test_trace_best_first_wins_ties() {
        let mut trace = OptimisationTrace::default();
        for (policy, objective) in [(1.0, 0.3), (2.0, 0.1), (3.0, 0.1)] {
            trace.push(TrialRecord {
                policy,
                probabilities: RiskProbabilities::default(),
                objective,
            });
        }
        assert_eq!(trace.best().map(|t| t.policy), Some(2.0));
        assert_eq!(trace.len(), 3);
    }
}
