//! Minimiser configuration.

/// Configuration for the bounded scalar minimiser.
///
/// # Example
///
/// ```
/// use dsa_core::math::solvers::MinimiserConfig;
///
/// let config = MinimiserConfig::default();
/// assert_eq!(config.tolerance, 1e-5);
/// assert_eq!(config.max_iterations, 500);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MinimiserConfig {
    /// Absolute tolerance on the minimiser location.
    pub tolerance: f64,

    /// Maximum number of objective evaluations.
    ///
    /// When exhausted the best point found so far is returned with
    /// `converged = false`.
    pub max_iterations: usize,
}

impl Default for MinimiserConfig {
    /// Default values:
    /// - `tolerance`: 1e-5
    /// - `max_iterations`: 500
    fn default() -> Self {
        Self {
            tolerance: 1e-5,
            max_iterations: 500,
        }
    }
}

impl MinimiserConfig {
    /// Create a new configuration with specified values.
    ///
    /// # Panics
    ///
    /// Panics if `tolerance <= 0` or `max_iterations == 0`.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        assert!(tolerance > 0.0, "tolerance must be positive");
        assert!(max_iterations > 0, "max_iterations must be > 0");
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Tighter tolerance (1e-10) and a larger budget (1000).
    pub fn high_precision() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 1000,
        }
    }

    /// Relaxed tolerance (1e-3) and a small budget (100).
    pub fn fast() -> Self {
        Self {
            tolerance: 1e-3,
            max_iterations: 100,
        }
    }
}
