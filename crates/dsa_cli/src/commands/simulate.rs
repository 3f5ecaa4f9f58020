//! Simulate command implementation
//!
//! Simulates debt paths around the configured baseline and reports the
//! risk probabilities of every criterion the horizon supports.

use std::path::Path;

use dsa_core::math::stats::percentiles;
use dsa_core::types::{ShockFrequency, ShockPanel};
use dsa_stochastic::risk::STABLE_LOOKBACK;
use dsa_stochastic::{simulate, EstimationMode, RiskCriterion, RiskEstimator, RiskProbabilities};
use serde::Serialize;
use tracing::info;

use super::write_json;
use crate::config::RunConfig;
use crate::data::prepare_panel;
use crate::Result;

/// Summary of a simulation run.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub n_paths: usize,
    pub mode: EstimationMode,
    pub frequency: ShockFrequency,
    pub first_year: i32,
    pub last_year: i32,
    pub probabilities: RiskProbabilities,
    /// p10, p50 and p90 of terminal debt.
    pub terminal_debt: [f64; 3],
}

/// Simulates against an already prepared panel.
pub fn execute(config: &RunConfig, panel: &ShockPanel) -> Result<SimulationReport> {
    let request = config.simulation_request()?;
    let result = simulate(&request, panel, &config.baseline)?;

    // The stable criterion needs a full lookback window.
    let mut criteria = vec![RiskCriterion::Declines, RiskCriterion::Below60];
    if result.paths.debt.n_cols() >= STABLE_LOOKBACK {
        criteria.insert(1, RiskCriterion::Stable);
    }
    let estimator = RiskEstimator::new(criteria, config.calibration.criterion_start);
    let probabilities = estimator.evaluate(&result.paths.debt)?;
    let terminal = percentiles(&result.paths.debt.last_column(), &[10.0, 50.0, 90.0]);

    Ok(SimulationReport {
        seed: result.seed,
        n_paths: request.n_paths(),
        mode: request.mode(),
        frequency: panel.frequency(),
        first_year: config.baseline.year(request.stochastic_start()),
        last_year: config.baseline.year(request.stochastic_end()),
        probabilities,
        terminal_debt: [terminal[0], terminal[1], terminal[2]],
    })
}

/// Run the simulate command
pub fn run(config: &RunConfig, output: Option<&Path>) -> Result<()> {
    info!("Starting simulation...");
    info!("  Country: {}", config.data.country);
    info!("  Paths: {}", config.simulation.n_paths);

    let panel = prepare_panel(&config.data, config.simulation.currency_regime)?;
    let report = execute(config, &panel)?;

    info!(
        seed = report.seed,
        declines = ?report.probabilities.declines,
        stable = ?report.probabilities.stable,
        below_60 = ?report.probabilities.below_60,
        "Simulation complete"
    );
    write_json(&report, output)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::tests::sample;
    use dsa_core::rng::DsaRng;

    pub(crate) fn panel() -> ShockPanel {
        let mut rng = DsaRng::from_seed(3);
        let rows = (0..80)
            .map(|_| {
                let mut row = [0.0; 6];
                rng.fill_normal(&mut row);
                row[0] *= 0.01;
                row[1] *= 0.01;
                row
            })
            .collect();
        let periods = (0..80)
            .map(|i| format!("{}Q{}", 2000 + i / 4, i % 4 + 1))
            .collect();
        ShockPanel::new(ShockFrequency::Quarterly, periods, rows).unwrap()
    }

    #[test]
    fn test_execute_reports_all_criteria() {
        let config = sample();
        let report = execute(&config, &panel()).unwrap();
        assert_eq!(report.seed, 7);
        assert_eq!(report.n_paths, 500);
        assert_eq!(report.first_year, 2026);
        assert_eq!(report.last_year, 2030);
        assert!(report.probabilities.declines.is_some());
        assert!(report.probabilities.stable.is_some());
        assert!(report.probabilities.below_60.is_some());
        assert!(report.terminal_debt[0] <= report.terminal_debt[1]);
        assert!(report.terminal_debt[1] <= report.terminal_debt[2]);
    }

    #[test]
    fn test_report_serialises() {
        let report = execute(&sample(), &panel()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "var_cholesky");
        assert_eq!(json["frequency"], "quarterly");
        assert!(json["probabilities"]["below_60"].is_number());
    }
}
