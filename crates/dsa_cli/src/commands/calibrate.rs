//! Calibrate command implementation
//!
//! Finds the end-of-adjustment primary balance at which the configured risk
//! criteria reach the target probability, then selects the binding scenario
//! against the deterministic requirements listed in the configuration.

use std::path::Path;

use dsa_core::types::ShockPanel;
use dsa_stochastic::calibrator::ProfilePoint;
use dsa_stochastic::{
    BindingScenario, BindingScenarioSelector, CalibrationResult, RiskCriterion,
    RiskProbabilities, StochasticCalibrator, StochasticError,
};
use serde::Serialize;
use tracing::{info, warn};

use super::{write_csv, write_json};
use crate::config::RunConfig;
use crate::data::prepare_panel;
use crate::projector::LinearAdjustmentProjector;
use crate::{CliError, Result};

/// Calibration outcome written by the command.
#[derive(Debug, Serialize)]
pub struct CalibrationReport {
    pub target: f64,
    pub criteria: Vec<RiskCriterion>,
    /// Present when the stochastic calibration succeeded.
    pub stochastic: Option<StochasticOutcome>,
    pub candidates: Vec<BindingScenario>,
    pub binding: Option<BindingScenario>,
}

/// Successful stochastic calibration.
#[derive(Debug, Serialize)]
pub struct StochasticOutcome {
    pub seed: u64,
    pub policy: f64,
    pub converged: bool,
    pub objective: f64,
    pub probabilities: RiskProbabilities,
    pub iterations: usize,
    pub duration_ms: u128,
}

impl From<&CalibrationResult> for StochasticOutcome {
    fn from(result: &CalibrationResult) -> Self {
        Self {
            seed: result.simulation.seed,
            policy: result.policy,
            converged: result.converged,
            objective: result.objective,
            probabilities: result.probabilities,
            iterations: result.diagnostics.iterations,
            duration_ms: result.diagnostics.duration.as_millis(),
        }
    }
}

/// One row of the trial trace file.
#[derive(Debug, Serialize)]
struct TraceRow {
    trial: usize,
    policy: f64,
    declines: Option<f64>,
    stable: Option<f64>,
    below_60: Option<f64>,
    objective: f64,
}

fn adjustment_projector(config: &RunConfig) -> Result<LinearAdjustmentProjector> {
    LinearAdjustmentProjector::new(
        config.baseline.clone(),
        config.calibration.adjustment_start,
        config.calibration.adjustment_period,
    )
    .map_err(|e| CliError::Engine(StochasticError::from(e)))
}

/// Runs the stochastic calibration against an already prepared panel.
pub fn calibrate(config: &RunConfig, panel: &ShockPanel) -> Result<CalibrationResult> {
    let request = config.calibration_request()?;
    let calibrator = StochasticCalibrator::new(config.calibration.to_calibration_config()?);
    let mut projector = adjustment_projector(config)?;
    Ok(calibrator.calibrate(&mut projector, &request, panel)?)
}

/// Builds the report from a calibration outcome.
///
/// A failed stochastic calibration is reported without a stochastic
/// candidate; configuration errors still fail the command.
pub fn report(
    config: &RunConfig,
    outcome: std::result::Result<&CalibrationResult, &CliError>,
) -> Result<CalibrationReport> {
    let mut selector = BindingScenarioSelector::new();
    for (name, policy) in &config.calibration.deterministic {
        selector.add_deterministic(name.clone(), *policy)?;
    }

    let stochastic = match outcome {
        Ok(result) => {
            selector.add_stochastic(Ok(result));
            Some(StochasticOutcome::from(result))
        }
        Err(CliError::Engine(err)) if !err.is_request() => {
            selector.add_stochastic(Err(err));
            None
        }
        Err(err) => {
            return Err(CliError::InvalidArgument(format!(
                "calibration could not start: {}",
                err
            )))
        }
    };

    Ok(CalibrationReport {
        target: config.calibration.target,
        criteria: config.calibration.criteria.clone(),
        stochastic,
        candidates: selector.candidates().to_vec(),
        binding: selector.select(),
    })
}

/// Run the calibrate command
pub fn run(
    config: &RunConfig,
    output: Option<&Path>,
    trace: Option<&Path>,
    profile: Option<usize>,
) -> Result<()> {
    info!("Starting calibration...");
    info!("  Country: {}", config.data.country);
    info!("  Target probability: {}", config.calibration.target);
    info!(
        "  Criteria: {}",
        config
            .calibration
            .criteria
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let panel = prepare_panel(&config.data, config.simulation.currency_regime)?;
    let outcome = calibrate(config, &panel);
    if let Err(err) = &outcome {
        warn!("Stochastic calibration failed: {}", err);
    }
    let report = report(config, outcome.as_ref())?;

    if let (Ok(result), Some(path)) = (&outcome, trace) {
        let rows: Vec<TraceRow> = result
            .trace
            .trials()
            .iter()
            .enumerate()
            .map(|(trial, t)| TraceRow {
                trial,
                policy: t.policy,
                declines: t.probabilities.declines,
                stable: t.probabilities.stable,
                below_60: t.probabilities.below_60,
                objective: t.objective,
            })
            .collect();
        write_csv(&rows, Some(path))?;
    }

    if let (Ok(result), Some(points)) = (&outcome, profile) {
        let points = objective_profile(config, result, points)?;
        let best = points
            .iter()
            .min_by(|a, b| a.objective.total_cmp(&b.objective));
        if let Some(best) = best {
            info!(policy = best.policy, objective = best.objective, "Profile minimum");
        }
    }

    if let Some(binding) = &report.binding {
        info!("Binding scenario: {} ({:.3})", binding.criterion, binding.policy);
    }
    write_json(&report, output)
}

fn objective_profile(
    config: &RunConfig,
    result: &CalibrationResult,
    points: usize,
) -> Result<Vec<ProfilePoint>> {
    let request = config.calibration_request()?;
    let calibrator = StochasticCalibrator::new(config.calibration.to_calibration_config()?);
    let mut projector = adjustment_projector(config)?;
    Ok(calibrator.objective_profile(
        &mut projector,
        &request,
        &result.simulation.annual,
        points,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::simulate::tests::panel;
    use crate::config::tests::sample;
    use dsa_core::types::{EstimationError, ShockFrequency};

    #[test]
    fn test_calibration_within_bounds() {
        let config = sample();
        let result = calibrate(&config, &panel()).unwrap();
        assert!(result.policy > -5.0 && result.policy < 5.0);
        assert_eq!(result.trace.len(), result.diagnostics.iterations);
        // The re-projected baseline ends the adjustment at the policy level.
        assert!((result.baseline.primary_balance[4] - result.policy).abs() < 1e-12);
    }

    #[test]
    fn test_report_binds_larger_requirement() {
        let mut config = sample();
        config
            .calibration
            .deterministic
            .insert("demanding".to_string(), 4.99);
        let result = calibrate(&config, &panel()).unwrap();
        let report = report(&config, Ok(&result)).unwrap();

        assert_eq!(report.candidates.len(), 3);
        let binding = report.binding.unwrap();
        assert_eq!(binding.criterion, "demanding");
        assert!(report.stochastic.is_some());
    }

    #[test]
    fn test_failed_estimation_falls_back_to_deterministic() {
        let config = sample();
        let failure = CliError::Engine(StochasticError::Estimation(
            EstimationError::InsufficientObservations { got: 3, need: 8 },
        ));
        let report = report(&config, Err(&failure)).unwrap();
        assert!(report.stochastic.is_none());
        let binding = report.binding.unwrap();
        assert_eq!(binding.criterion, "debt_sustainability");
        assert_eq!(binding.policy, 0.8);
    }

    #[test]
    fn test_too_short_panel_fails_estimation() {
        let config = sample();
        let short = ShockPanel::new(
            ShockFrequency::Quarterly,
            vec!["2020Q1".to_string(), "2020Q2".to_string(), "2020Q3".to_string()],
            vec![[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]; 3],
        )
        .unwrap();
        let err = calibrate(&config, &short).unwrap_err();
        assert!(matches!(err, CliError::Engine(ref e) if e.is_estimation()));
    }
}
