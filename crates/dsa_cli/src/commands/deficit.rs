//! Deficit command implementation
//!
//! Reports the probability of an excessive deficit in each adjustment year.

use std::path::Path;

use dsa_core::types::ShockPanel;
use dsa_stochastic::{excessive_deficit_probability, DeficitRequest, DeficitResult};
use serde::Serialize;
use tracing::info;

use super::write_json;
use crate::config::RunConfig;
use crate::data::prepare_panel;
use crate::{CliError, Result};

/// Probability of one adjustment year.
#[derive(Debug, Serialize, PartialEq)]
pub struct YearProbability {
    pub year: i32,
    pub probability: f64,
}

/// Output of the deficit command.
#[derive(Debug, Serialize)]
pub struct DeficitReport {
    pub seed: u64,
    pub request: DeficitRequest,
    pub years: Vec<YearProbability>,
}

impl DeficitReport {
    fn new(request: DeficitRequest, result: &DeficitResult) -> Self {
        let years = result
            .years
            .iter()
            .zip(&result.probabilities)
            .map(|(&year, &probability)| YearProbability { year, probability })
            .collect();
        Self {
            seed: result.seed,
            request,
            years,
        }
    }
}

/// Runs the deficit simulation against an already prepared panel.
pub fn execute(config: &RunConfig, panel: &ShockPanel) -> Result<DeficitReport> {
    let deficit = config.deficit.ok_or_else(|| {
        CliError::InvalidArgument("the configuration has no [deficit] section".to_string())
    })?;
    let request = config.simulation_request()?;
    let result = excessive_deficit_probability(&request, &deficit, panel, &config.baseline)?;
    Ok(DeficitReport::new(deficit, &result))
}

/// Run the deficit command
pub fn run(config: &RunConfig, output: Option<&Path>) -> Result<()> {
    info!("Computing excessive deficit probabilities...");
    info!("  Country: {}", config.data.country);

    let panel = prepare_panel(&config.data, config.simulation.currency_regime)?;
    let report = execute(config, &panel)?;
    for entry in &report.years {
        info!("  {}: {:.3}", entry.year, entry.probability);
    }
    write_json(&report, output)
}
