//! Shock variables and sampling frequency.
//!
//! The shock vector has a fixed layout of six economic variables. Every
//! array in the workspace that carries raw shocks uses this order.

use std::fmt;
use std::str::FromStr;

use super::error::DataError;

/// Number of shock variables in the fixed shock vector.
pub const N_SHOCK_VARIABLES: usize = 6;

/// One of the six historical shock variables.
///
/// The discriminant is the column position in every shock array.
///
/// # Examples
///
/// ```
/// use dsa_core::types::ShockVariable;
///
/// assert_eq!(ShockVariable::PrimaryBalance.index(), 5);
/// assert_eq!(ShockVariable::ExrUsd.column_name(), "EXR_USD");
/// assert_eq!("NOMINAL_GDP_GROWTH".parse::<ShockVariable>().unwrap(), ShockVariable::NominalGdpGrowth);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShockVariable {
    /// Exchange-rate return against the euro.
    ExrEur = 0,
    /// Exchange-rate return against the US dollar.
    ExrUsd = 1,
    /// Short-term interest rate.
    InterestRateSt = 2,
    /// Long-term interest rate.
    InterestRateLt = 3,
    /// Nominal GDP growth.
    NominalGdpGrowth = 4,
    /// Primary balance.
    PrimaryBalance = 5,
}

impl ShockVariable {
    /// All variables in column order.
    pub const ALL: [ShockVariable; N_SHOCK_VARIABLES] = [
        ShockVariable::ExrEur,
        ShockVariable::ExrUsd,
        ShockVariable::InterestRateSt,
        ShockVariable::InterestRateLt,
        ShockVariable::NominalGdpGrowth,
        ShockVariable::PrimaryBalance,
    ];

    /// Column position in shock arrays.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column header used in shock data files.
    pub fn column_name(self) -> &'static str {
        match self {
            ShockVariable::ExrEur => "EXR_EUR",
            ShockVariable::ExrUsd => "EXR_USD",
            ShockVariable::InterestRateSt => "INTEREST_RATE_ST",
            ShockVariable::InterestRateLt => "INTEREST_RATE_LT",
            ShockVariable::NominalGdpGrowth => "NOMINAL_GDP_GROWTH",
            ShockVariable::PrimaryBalance => "PRIMARY_BALANCE",
        }
    }

    /// Whether this variable is an exchange-rate channel.
    #[inline]
    pub fn is_exchange_rate(self) -> bool {
        matches!(self, ShockVariable::ExrEur | ShockVariable::ExrUsd)
    }
}

impl fmt::Display for ShockVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for ShockVariable {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShockVariable::ALL
            .into_iter()
            .find(|v| v.column_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DataError::UnknownColumn(s.to_string()))
    }
}

/// Sampling frequency of historical shocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ShockFrequency {
    /// Four observations per year.
    #[default]
    Quarterly,
    /// One observation per year.
    Annual,
}

impl ShockFrequency {
    /// Number of draw steps per simulated year.
    #[inline]
    pub fn periods_per_year(self) -> usize {
        match self {
            ShockFrequency::Quarterly => 4,
            ShockFrequency::Annual => 1,
        }
    }

    /// Number of draw steps covering `years` simulated years.
    #[inline]
    pub fn draw_steps(self, years: usize) -> usize {
        years * self.periods_per_year()
    }
}

impl fmt::Display for ShockFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShockFrequency::Quarterly => f.write_str("quarterly"),
            ShockFrequency::Annual => f.write_str("annual"),
        }
    }
}

impl FromStr for ShockFrequency {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quarterly" | "q" => Ok(ShockFrequency::Quarterly),
            "annual" | "a" | "y" => Ok(ShockFrequency::Annual),
            other => Err(DataError::InvalidInput(format!(
                "unknown shock frequency '{}': expected quarterly or annual",
                other
            ))),
        }
    }
}
