//! Core data types for stochastic debt sustainability analysis.
//!
//! - [`ShockVariable`], [`ShockFrequency`]: the fixed six-variable shock vector
//! - [`ShockPanel`], [`PanelSource`]: historical shock observations
//! - [`BaselinePaths`], [`DebtComposition`]: deterministic inputs to the simulation
//! - [`DataError`], [`EstimationError`], [`SolverError`]: structured errors

pub mod baseline;
pub mod error;
pub mod panel;
pub mod shock;

pub use baseline::{BaselinePaths, DebtComposition};
pub use error::{DataError, EstimationError, SolverError};
pub use panel::{PanelSource, ShockPanel};
pub use shock::{ShockFrequency, ShockVariable, N_SHOCK_VARIABLES};
