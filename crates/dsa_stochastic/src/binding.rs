//! Binding scenario selection.
//!
//! Picks the most demanding policy value across deterministic criteria and
//! the optional stochastic calibration. A failed stochastic calibration
//! (typically too little shock history) is skipped with a warning rather
//! than failing the selection.

use tracing::{debug, warn};

use crate::calibrator::CalibrationResult;
use crate::error::{RequestError, StochasticError};

/// Criterion name used for the stochastic candidate.
pub const STOCHASTIC_CRITERION: &str = "stochastic";

/// Selected binding scenario.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BindingScenario {
    /// Name of the binding criterion.
    pub criterion: String,
    /// Policy value required by that criterion.
    pub policy: f64,
}

/// Collects candidate policy values and selects the largest.
///
/// Candidates keep insertion order; the first of several equal maxima wins.
///
/// # Example
///
/// ```
/// use dsa_stochastic::BindingScenarioSelector;
///
/// let mut selector = BindingScenarioSelector::new();
/// selector.add_deterministic("main_adjustment", 0.8).unwrap();
/// selector.add_deterministic("adverse_r_g", 1.4).unwrap();
/// selector.add_deterministic("lower_spb", 1.4).unwrap();
///
/// let binding = selector.select().unwrap();
/// assert_eq!(binding.criterion, "adverse_r_g");
/// assert_eq!(binding.policy, 1.4);
/// ```
#[derive(Clone, Debug, Default)]
pub struct BindingScenarioSelector {
    candidates: Vec<BindingScenario>,
}

impl BindingScenarioSelector {
    /// Create an empty selector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the result of a deterministic criterion.
    ///
    /// # Errors
    ///
    /// `RequestError::InvalidParameter` for a non-finite policy value.
    pub fn add_deterministic(
        &mut self,
        criterion: impl Into<String>,
        policy: f64,
    ) -> Result<(), RequestError> {
        let criterion = criterion.into();
        if !policy.is_finite() {
            return Err(RequestError::invalid(
                "policy",
                format!("criterion '{}' returned {}", criterion, policy),
            ));
        }
        self.candidates.push(BindingScenario { criterion, policy });
        Ok(())
    }

    /// Add the outcome of a stochastic calibration.
    ///
    /// Errors are logged and skipped. Returns whether a candidate was added.
    pub fn add_stochastic(&mut self, outcome: Result<&CalibrationResult, &StochasticError>) -> bool {
        match outcome {
            Ok(result) if result.policy.is_finite() => {
                self.candidates.push(BindingScenario {
                    criterion: STOCHASTIC_CRITERION.to_string(),
                    policy: result.policy,
                });
                true
            }
            Ok(result) => {
                warn!(policy = result.policy, "skipping non-finite stochastic policy");
                false
            }
            Err(err) => {
                warn!(error = %err, "stochastic calibration unavailable, skipping");
                false
            }
        }
    }

    /// Candidates in insertion order.
    pub fn candidates(&self) -> &[BindingScenario] {
        &self.candidates
    }

    /// Largest candidate, `None` if there are none.
    pub fn select(&self) -> Option<BindingScenario> {
        let binding = self
            .candidates
            .iter()
            .reduce(|best, c| if c.policy > best.policy { c } else { best })?;
        debug!(
            criterion = %binding.criterion,
            policy = binding.policy,
            candidates = self.candidates.len(),
            "selected binding scenario"
        );
        Some(binding.clone())
    }
}
