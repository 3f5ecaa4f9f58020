//! Error types for the stochastic engine.
//!
//! - `RequestError`: invalid simulation, calibration or deficit requests
//! - `ProjectionError`: failure reported by the external baseline projector
//! - `StochasticError`: umbrella error returned by the top-level operations
//!
//! Estimation and configuration failures are fatal and propagate with `?`.
//! Negative debt draws and the quarterly-to-annual fallback are handled
//! locally and never surface here.

use dsa_core::types::{DataError, EstimationError, SolverError};
use thiserror::Error;

/// Invalid request or configuration.
///
/// # Examples
///
/// ```
/// use dsa_stochastic::RequestError;
///
/// let err = RequestError::InvalidPathCount(0);
/// assert!(err.to_string().contains("Invalid path count 0"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    /// Path count outside `[1, MAX_PATHS]`.
    #[error("Invalid path count {0}: must be in range [1, 10_000_000]")]
    InvalidPathCount(usize),

    /// Stochastic horizon of zero years.
    #[error("Stochastic horizon must cover at least one year")]
    EmptyHorizon,

    /// The stochastic window does not fit inside the baseline projection.
    #[error("Stochastic window {start}..={end} does not fit a baseline of {baseline_len} years")]
    WindowOutOfRange {
        /// First stochastic index
        start: usize,
        /// Last stochastic index
        end: usize,
        /// Baseline length
        baseline_len: usize,
    },

    /// No risk criterion selected for calibration.
    #[error("No risk criterion configured")]
    NoCriteria,

    /// Named parameter with an invalid value.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Description of the problem
        reason: String,
    },
}

impl RequestError {
    /// Create an invalid parameter error.
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Check if this is a configuration error raised before any work.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NoCriteria | Self::InvalidParameter { .. })
    }
}

/// Failure reported by a baseline projector.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Baseline projection failed: {message}")]
pub struct ProjectionError {
    message: String,
}

impl ProjectionError {
    /// Create a projection error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Umbrella error for simulation and calibration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StochasticError {
    /// Invalid input data.
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Shock distribution could not be fitted.
    #[error("Estimation error: {0}")]
    Estimation(#[from] EstimationError),

    /// Invalid request or configuration.
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Minimiser failure.
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    /// Baseline projector failure.
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

impl StochasticError {
    /// Check if the failure came from shock estimation.
    pub fn is_estimation(&self) -> bool {
        matches!(self, Self::Estimation(_))
    }

    /// Check if the request itself was rejected.
    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }
}
