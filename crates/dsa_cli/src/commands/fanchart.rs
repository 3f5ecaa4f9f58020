//! Fanchart command implementation
//!
//! Writes the percentile table of one simulated variable, joined by year
//! with its baseline, as CSV.

use std::path::Path;

use dsa_core::types::ShockPanel;
use dsa_stochastic::{simulate, BaselineProjector, FanChart, PathVariable, StochasticError};
use serde::Serialize;
use tracing::info;

use super::write_csv;
use crate::config::RunConfig;
use crate::data::prepare_panel;
use crate::projector::LinearAdjustmentProjector;
use crate::{CliError, Result};

/// One CSV row; percentile cells are empty outside the stochastic window.
#[derive(Debug, Serialize)]
pub struct FanChartCsvRow {
    pub year: i32,
    pub baseline: f64,
    pub p10: Option<f64>,
    pub p20: Option<f64>,
    pub p30: Option<f64>,
    pub p40: Option<f64>,
    pub p50: Option<f64>,
    pub p60: Option<f64>,
    pub p70: Option<f64>,
    pub p80: Option<f64>,
    pub p90: Option<f64>,
}

impl From<&dsa_stochastic::fanchart::FanChartRow> for FanChartCsvRow {
    fn from(row: &dsa_stochastic::fanchart::FanChartRow) -> Self {
        let p = |i: usize| row.percentiles.map(|band| band[i]);
        Self {
            year: row.year,
            baseline: row.baseline,
            p10: p(0),
            p20: p(1),
            p30: p(2),
            p40: p(3),
            p50: p(4),
            p60: p(5),
            p70: p(6),
            p80: p(7),
            p90: p(8),
        }
    }
}

/// Builds the fan chart, optionally around the baseline adjusted to
/// `policy`.
pub fn execute(
    config: &RunConfig,
    panel: &ShockPanel,
    variable: PathVariable,
    policy: Option<f64>,
) -> Result<FanChart> {
    let baseline = match policy {
        Some(_) => LinearAdjustmentProjector::new(
            config.baseline.clone(),
            config.calibration.adjustment_start,
            config.calibration.adjustment_period,
        )
        .and_then(|mut projector| projector.project(policy))
        .map_err(|e| CliError::Engine(StochasticError::from(e)))?,
        None => config.baseline.clone(),
    };

    let request = config.simulation_request()?;
    let result = simulate(&request, panel, &baseline)?;
    Ok(FanChart::build(variable, &result.paths, &baseline)?)
}

/// Run the fanchart command
pub fn run(
    config: &RunConfig,
    variable: &str,
    policy: Option<f64>,
    output: Option<&Path>,
) -> Result<()> {
    let variable: PathVariable = variable
        .parse()
        .map_err(|e: dsa_stochastic::RequestError| CliError::InvalidArgument(e.to_string()))?;
    info!("Building fan chart...");
    info!("  Variable: {}", variable);
    if let Some(policy) = policy {
        info!("  Policy: {}", policy);
    }

    let panel = prepare_panel(&config.data, config.simulation.currency_regime)?;
    let chart = execute(config, &panel, variable, policy)?;
    let rows: Vec<FanChartCsvRow> = chart.rows.iter().map(FanChartCsvRow::from).collect();
    write_csv(&rows, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::simulate::tests::panel;
    use crate::config::tests::sample;

    #[test]
    fn test_debt_fan_chart_rows() {
        let config = sample();
        let chart = execute(&config, &panel(), PathVariable::Debt, None).unwrap();
        let rows: Vec<FanChartCsvRow> = chart.rows.iter().map(FanChartCsvRow::from).collect();

        assert_eq!(rows.len(), 10);
        assert!(rows[0].p50.is_none());
        // Column 0 of the window is the unshocked pre-stochastic year.
        assert_eq!(rows[1].p10, Some(100.0));
        assert_eq!(rows[1].p90, Some(100.0));
        assert!(rows[6].p10 <= rows[6].p90);
        assert!(rows[7].p50.is_none());
    }

    #[test]
    fn test_policy_shifts_baseline() {
        let config = sample();
        let chart = execute(&config, &panel(), PathVariable::PrimaryBalance, Some(2.0)).unwrap();
        assert_eq!(chart.rows[4].baseline, 2.0);
        assert_eq!(chart.rows[9].baseline, 2.0);
    }

    #[test]
    fn test_csv_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fan.csv");
        let chart = execute(&sample(), &panel(), PathVariable::Debt, None).unwrap();
        let rows: Vec<FanChartCsvRow> = chart.rows.iter().map(FanChartCsvRow::from).collect();
        write_csv(&rows, Some(&path)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("year,baseline,p10,p20,p30,p40,p50,p60,p70,p80,p90")
        );
        assert!(lines.next().unwrap().starts_with("2024,100.0,,"));
    }
}
