//! Shock panel loading from CSV files.
//!
//! Files carry one row per country and period with the columns
//! `YEAR` (or `PERIOD`), `COUNTRY` and the six shock columns. Rows of other
//! countries are skipped. An empty cell in the exchange-rate column the
//! currency regime leaves out reads as zero; rows with any other empty
//! shock cell are dropped.

use std::path::Path;

use dsa_core::types::{PanelSource, ShockFrequency, ShockPanel, ShockVariable, N_SHOCK_VARIABLES};
use dsa_stochastic::CurrencyRegime;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DataConfig;
use crate::{CliError, Result};

#[derive(Debug, Deserialize)]
struct ShockRecord {
    #[serde(rename = "YEAR", alias = "PERIOD")]
    period: String,
    #[serde(rename = "COUNTRY")]
    country: String,
    #[serde(rename = "EXR_EUR")]
    exr_eur: Option<f64>,
    #[serde(rename = "EXR_USD")]
    exr_usd: Option<f64>,
    #[serde(rename = "INTEREST_RATE_ST")]
    interest_rate_st: Option<f64>,
    #[serde(rename = "INTEREST_RATE_LT")]
    interest_rate_lt: Option<f64>,
    #[serde(rename = "NOMINAL_GDP_GROWTH")]
    nominal_gdp_growth: Option<f64>,
    #[serde(rename = "PRIMARY_BALANCE")]
    primary_balance: Option<f64>,
}

impl ShockRecord {
    /// Complete shock row; a blank `unused` cell counts as zero.
    fn row(&self, unused: Option<ShockVariable>) -> Option<[f64; N_SHOCK_VARIABLES]> {
        let cells = [
            self.exr_eur,
            self.exr_usd,
            self.interest_rate_st,
            self.interest_rate_lt,
            self.nominal_gdp_growth,
            self.primary_balance,
        ];
        let mut row = [0.0; N_SHOCK_VARIABLES];
        for ((variable, cell), value) in ShockVariable::ALL.into_iter().zip(cells).zip(&mut row) {
            *value = match cell {
                Some(v) => v,
                None if unused == Some(variable) => 0.0,
                None => return None,
            };
        }
        Some(row)
    }
}

/// Reads one country's shocks from a CSV reader.
///
/// Returns `Ok(None)` when the country has no complete observations.
pub fn read_panel<R: std::io::Read>(
    reader: R,
    country: &str,
    frequency: ShockFrequency,
    regime: CurrencyRegime,
) -> Result<Option<ShockPanel>> {
    let unused = regime.dropped_variable();
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut periods = Vec::new();
    let mut rows = Vec::new();
    let mut incomplete = 0usize;

    for record in csv_reader.deserialize() {
        let record: ShockRecord = record?;
        if !record.country.eq_ignore_ascii_case(country) {
            continue;
        }
        match record.row(unused) {
            Some(row) => {
                periods.push(record.period);
                rows.push(row);
            }
            None => incomplete += 1,
        }
    }

    if incomplete > 0 {
        warn!(country, %frequency, incomplete, "Dropped shock rows with missing values");
    }
    if rows.is_empty() {
        return Ok(None);
    }
    debug!(country, %frequency, rows = rows.len(), "Loaded shock panel");
    Ok(Some(ShockPanel::new(frequency, periods, rows)?))
}

/// Reads one country's shocks from a CSV file.
pub fn load_panel(
    path: &Path,
    country: &str,
    frequency: ShockFrequency,
    regime: CurrencyRegime,
) -> Result<Option<ShockPanel>> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }
    let file = std::fs::File::open(path)?;
    read_panel(file, country, frequency, regime)
}

/// Loads the configured files and resolves the panel to sample from.
pub fn prepare_panel(data: &DataConfig, regime: CurrencyRegime) -> Result<ShockPanel> {
    let quarterly = match &data.quarterly {
        Some(path) => load_panel(path, &data.country, ShockFrequency::Quarterly, regime)?,
        None => None,
    };
    let annual = match &data.annual {
        Some(path) => load_panel(path, &data.country, ShockFrequency::Annual, regime)?,
        None => None,
    };
    let source = PanelSource::new(quarterly, annual);
    Ok(source.prepare(data.frequency, data.sample_start, data.winsorize)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    const QUARTERLY: &str = "\
YEAR,COUNTRY,EXR_EUR,EXR_USD,INTEREST_RATE_ST,INTEREST_RATE_LT,NOMINAL_GDP_GROWTH,PRIMARY_BALANCE
1999Q4,FRA,0.0,0.01,0.1,0.2,0.5,-0.1
2000Q1,FRA,0.0,0.02,0.1,0.1,0.4,0.2
2000Q2,FRA,0.0,-0.01,-0.2,0.0,0.3,0.1
2000Q3,FRA,0.0,,0.1,0.1,0.2,0.0
2000Q1,ITA,0.0,0.02,0.3,0.4,0.1,0.3
";

    #[test]
    fn test_read_panel_filters_country_and_missing() {
        let panel = read_panel(
            QUARTERLY.as_bytes(),
            "fra",
            ShockFrequency::Quarterly,
            CurrencyRegime::Floating,
        )
        .unwrap()
        .unwrap();
        assert_eq!(panel.len(), 3);
        assert_eq!(panel.periods()[0], "1999Q4");
        assert_eq!(panel.rows()[1], [0.0, 0.02, 0.1, 0.1, 0.4, 0.2]);
    }

    #[test]
    fn test_unknown_country_yields_none() {
        let panel = read_panel(
            QUARTERLY.as_bytes(),
            "DEU",
            ShockFrequency::Quarterly,
            CurrencyRegime::Floating,
        )
        .unwrap();
        assert!(panel.is_none());
    }

    #[test]
    fn test_blank_unused_exchange_rate_reads_as_zero() {
        let text = "\
YEAR,COUNTRY,EXR_EUR,EXR_USD,INTEREST_RATE_ST,INTEREST_RATE_LT,NOMINAL_GDP_GROWTH,PRIMARY_BALANCE
2001,FRA,,0.01,0.1,0.2,0.5,-0.1
2002,FRA,,0.02,0.1,0.1,0.4,0.2
2003,FRA,,,0.1,0.1,0.4,0.2
";
        let panel = read_panel(
            text.as_bytes(),
            "FRA",
            ShockFrequency::Annual,
            CurrencyRegime::EuroArea,
        )
        .unwrap()
        .unwrap();
        // The blank USD cell is still missing data.
        assert_eq!(panel.len(), 2);
        assert_eq!(panel.rows()[0], [0.0, 0.01, 0.1, 0.2, 0.5, -0.1]);

        let floating =
            read_panel(text.as_bytes(), "FRA", ShockFrequency::Annual, CurrencyRegime::Floating)
                .unwrap();
        assert!(floating.is_none());
    }

    #[test]
    fn test_period_header_alias() {
        let text = QUARTERLY.replacen("YEAR", "PERIOD", 1);
        let panel = read_panel(
            text.as_bytes(),
            "ITA",
            ShockFrequency::Quarterly,
            CurrencyRegime::Floating,
        )
        .unwrap()
        .unwrap();
        assert_eq!(panel.len(), 1);
    }

    #[test]
    fn test_prepare_falls_back_to_annual() {
        let dir = tempfile::tempdir().unwrap();
        let annual_path = dir.path().join("annual.csv");
        let mut file = std::fs::File::create(&annual_path).unwrap();
        writeln!(
            file,
            "YEAR,COUNTRY,EXR_EUR,EXR_USD,INTEREST_RATE_ST,INTEREST_RATE_LT,NOMINAL_GDP_GROWTH,PRIMARY_BALANCE"
        )
        .unwrap();
        for year in 1995..2020 {
            writeln!(file, "{},FRA,0.0,0.0,0.1,0.2,{},0.0", year, (year % 5) as f64).unwrap();
        }

        let data = DataConfig {
            country: "FRA".to_string(),
            quarterly: None,
            annual: Some(annual_path),
            frequency: ShockFrequency::Quarterly,
            sample_start: 2000,
            winsorize: false,
        };
        let panel = prepare_panel(&data, CurrencyRegime::Floating).unwrap();
        assert_eq!(panel.frequency(), ShockFrequency::Annual);
        assert_eq!(panel.len(), 20);
    }

    #[test]
    fn test_missing_file() {
        let err = load_panel(
            &PathBuf::from("/nonexistent/shocks.csv"),
            "FRA",
            ShockFrequency::Annual,
            CurrencyRegime::Floating,
        )
        .unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }
}
