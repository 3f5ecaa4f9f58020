//! Error types for structured error handling.
//!
//! This module provides:
//! - `DataError`: Errors from constructing shock panels and baselines
//! - `EstimationError`: Errors from fitting the joint shock distribution
//! - `SolverError`: Errors from the bounded scalar minimiser

use thiserror::Error;

/// Invalid or unusable input data.
///
/// # Examples
/// ```
/// use dsa_core::types::DataError;
///
/// let err = DataError::EmptyPanel;
/// assert_eq!(format!("{}", err), "Shock panel contains no observations");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// No observations remain in a shock panel.
    #[error("Shock panel contains no observations")]
    EmptyPanel,

    /// A value is NaN or infinite.
    #[error("Non-finite value in {field} at index {index}")]
    NonFinite {
        /// Name of the offending series
        field: String,
        /// Position of the offending value
        index: usize,
    },

    /// Two series that must align have different lengths.
    #[error("Length mismatch for {field}: expected {expected}, got {got}")]
    LengthMismatch {
        /// Name of the offending series
        field: String,
        /// Required length
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// A column header does not name a shock variable.
    #[error("Unknown shock column: {0}")]
    UnknownColumn(String),

    /// General invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Failure to fit the joint distribution of historical shocks.
///
/// Estimation failures are fatal for the country being simulated and are
/// propagated to the caller without retry.
///
/// # Examples
/// ```
/// use dsa_core::types::EstimationError;
///
/// let err = EstimationError::InsufficientObservations { got: 4, need: 8 };
/// assert!(format!("{}", err).contains("need at least 8"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    /// Too few observations for the number of parameters.
    #[error("Insufficient observations: got {got}, need at least {need}")]
    InsufficientObservations {
        /// Observations available
        got: usize,
        /// Observations required
        need: usize,
    },

    /// Regressor cross-product matrix cannot be inverted.
    #[error("Singular regressor matrix")]
    SingularRegressors,

    /// Covariance matrix has no Cholesky factor.
    #[error("Covariance matrix is not positive definite (pivot {pivot} = {value})")]
    NotPositiveDefinite {
        /// Pivot index where the decomposition broke down
        pivot: usize,
        /// Value of the failing pivot
        value: f64,
    },

    /// Matrix dimensions do not match.
    #[error("Invalid dimensions: expected {expected} elements, got {got}")]
    InvalidDimensions {
        /// Required element count
        expected: usize,
        /// Actual element count
        got: usize,
    },
}

/// Errors from the bounded scalar minimiser.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Lower bound is not strictly below the upper bound.
    #[error("Invalid bounds: lower {lower} must be below upper {upper}")]
    InvalidBounds {
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },

    /// Objective returned NaN or infinity.
    #[error("Objective is not finite at x = {x}")]
    NonFiniteObjective {
        /// Trial point
        x: f64,
    },

    /// Objective evaluation failed.
    #[error("Objective evaluation failed: {0}")]
    Objective(String),
}

impl DataError {
    /// Create a length mismatch error.
    pub fn length_mismatch(field: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::LengthMismatch {
            field: field.into(),
            expected,
            got,
        }
    }

    /// Create a non-finite value error.
    pub fn non_finite(field: impl Into<String>, index: usize) -> Self {
        Self::NonFinite {
            field: field.into(),
            index,
        }
    }
}

impl EstimationError {
    /// Check if the error is due to insufficient history.
    pub fn is_insufficient_observations(&self) -> bool {
        matches!(self, Self::InsufficientObservations { .. })
    }
}
