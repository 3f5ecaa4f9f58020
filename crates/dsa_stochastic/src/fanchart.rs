//! Fan-chart data.
//!
//! Percentile bands (10th to 90th, step 10, linear interpolation) of a
//! simulated variable across paths, joined by year with its baseline.

use std::fmt;
use std::str::FromStr;

use dsa_core::math::stats::percentiles;
use dsa_core::types::BaselinePaths;

use crate::error::RequestError;
use crate::simulator::{PathMatrix, SimulatedPathSet};

/// Percentile levels of a fan chart.
pub const FAN_PERCENTILES: [f64; 9] = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0];

/// Variable shown in a fan chart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PathVariable {
    /// Debt-to-GDP ratio.
    #[default]
    Debt,
    /// Exchange rate against the euro.
    ExrEur,
    /// Exchange rate against the US dollar.
    ExrUsd,
    /// Implicit interest rate.
    ImplicitRate,
    /// Nominal GDP growth.
    Growth,
    /// Primary balance.
    PrimaryBalance,
    /// Stock-flow adjustment.
    StockFlow,
    /// Overall balance.
    OverallBalance,
}

impl PathVariable {
    fn simulated<'a>(&self, paths: &'a SimulatedPathSet) -> Option<&'a PathMatrix> {
        match self {
            PathVariable::Debt => Some(&paths.debt),
            PathVariable::ExrEur => Some(&paths.exr_eur),
            PathVariable::ExrUsd => Some(&paths.exr_usd),
            PathVariable::ImplicitRate => Some(&paths.implicit_rate),
            PathVariable::Growth => Some(&paths.growth),
            PathVariable::PrimaryBalance => Some(&paths.primary_balance),
            PathVariable::StockFlow => Some(&paths.stock_flow),
            PathVariable::OverallBalance => paths.overall_balance.as_ref(),
        }
    }

    fn baseline<'a>(&self, baseline: &'a BaselinePaths) -> &'a [f64] {
        match self {
            PathVariable::Debt => &baseline.debt,
            PathVariable::ExrEur => &baseline.exr_eur,
            PathVariable::ExrUsd => &baseline.exr_usd,
            PathVariable::ImplicitRate => &baseline.implicit_rate,
            PathVariable::Growth => &baseline.growth,
            PathVariable::PrimaryBalance => &baseline.primary_balance,
            PathVariable::StockFlow => &baseline.stock_flow,
            PathVariable::OverallBalance => &baseline.overall_balance,
        }
    }
}

impl fmt::Display for PathVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PathVariable::Debt => "debt",
            PathVariable::ExrEur => "exr_eur",
            PathVariable::ExrUsd => "exr_usd",
            PathVariable::ImplicitRate => "implicit_rate",
            PathVariable::Growth => "growth",
            PathVariable::PrimaryBalance => "primary_balance",
            PathVariable::StockFlow => "stock_flow",
            PathVariable::OverallBalance => "overall_balance",
        };
        f.write_str(name)
    }
}

impl FromStr for PathVariable {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "debt" | "d" => Ok(PathVariable::Debt),
            "exr_eur" => Ok(PathVariable::ExrEur),
            "exr_usd" => Ok(PathVariable::ExrUsd),
            "implicit_rate" | "iir" => Ok(PathVariable::ImplicitRate),
            "growth" | "ng" => Ok(PathVariable::Growth),
            "primary_balance" | "pb" => Ok(PathVariable::PrimaryBalance),
            "stock_flow" | "sf" => Ok(PathVariable::StockFlow),
            "overall_balance" | "ob" => Ok(PathVariable::OverallBalance),
            other => Err(RequestError::invalid(
                "variable",
                format!("unknown path variable '{}'", other),
            )),
        }
    }
}

/// One year of a fan chart.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FanChartRow {
    /// Calendar year.
    pub year: i32,
    /// Baseline value.
    pub baseline: f64,
    /// Percentiles p10..p90, present inside the stochastic window.
    pub percentiles: Option<[f64; 9]>,
}

/// Fan chart over the whole baseline horizon.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FanChart {
    /// Charted variable.
    pub variable: PathVariable,
    /// One row per baseline year.
    pub rows: Vec<FanChartRow>,
}

impl FanChart {
    /// Builds the fan chart of `variable`.
    ///
    /// # Errors
    ///
    /// `RequestError::InvalidParameter` if the variable was not simulated
    /// (overall balance outside a deficit run) or the paths do not fit the
    /// baseline.
    pub fn build(
        variable: PathVariable,
        paths: &SimulatedPathSet,
        baseline: &BaselinePaths,
    ) -> Result<Self, RequestError> {
        let simulated = variable.simulated(paths).ok_or_else(|| {
            RequestError::invalid("variable", format!("'{}' was not simulated", variable))
        })?;
        let series = variable.baseline(baseline);
        let first = paths.baseline_index(0);
        let last = paths.baseline_index(simulated.n_cols() - 1);
        if last >= series.len() {
            return Err(RequestError::WindowOutOfRange {
                start: paths.stochastic_start,
                end: last,
                baseline_len: series.len(),
            });
        }

        let rows = series
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                let band = (first..=last).contains(&index).then(|| {
                    let col = simulated.column(index - first);
                    let mut out = [0.0; 9];
                    out.copy_from_slice(&percentiles(&col, &FAN_PERCENTILES));
                    out
                });
                FanChartRow {
                    year: baseline.year(index),
                    baseline: value,
                    percentiles: band,
                }
            })
            .collect();

        Ok(Self { variable, rows })
    }

    /// Median path over the stochastic window as `(year, p50)`.
    pub fn median(&self) -> Vec<(i32, f64)> {
        self.rows
            .iter()
            .filter_map(|r| r.percentiles.map(|p| (r.year, p[4])))
            .collect()
    }
}
