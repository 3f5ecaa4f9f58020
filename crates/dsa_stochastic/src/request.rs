//! Simulation request.
//!
//! A [`SimulationRequest`] is the immutable input of one simulation run.
//! It is built once, validated, and passed by reference through the
//! estimation, sampling, aggregation and simulation stages.

use std::fmt;
use std::str::FromStr;

use dsa_core::types::{DebtComposition, ShockFrequency, ShockVariable};

use crate::error::RequestError;

/// Maximum number of simulated paths.
pub const MAX_PATHS: usize = 10_000_000;

/// Default stochastic horizon in years.
pub const DEFAULT_HORIZON: usize = 5;

/// How the joint shock distribution is estimated and sampled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EstimationMode {
    /// Zero-mean multivariate normal with the sample covariance.
    #[default]
    Normal,
    /// Order-1 VAR driven by residuals resampled with replacement.
    VarBootstrap,
    /// Order-1 VAR driven by Cholesky-correlated normal residuals.
    VarCholesky,
}

impl EstimationMode {
    /// Whether this mode fits a VAR.
    #[inline]
    pub fn is_var(self) -> bool {
        !matches!(self, EstimationMode::Normal)
    }
}

impl fmt::Display for EstimationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimationMode::Normal => f.write_str("normal"),
            EstimationMode::VarBootstrap => f.write_str("var_bootstrap"),
            EstimationMode::VarCholesky => f.write_str("var_cholesky"),
        }
    }
}

impl FromStr for EstimationMode {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "normal" => Ok(EstimationMode::Normal),
            "var_bootstrap" | "bootstrap" => Ok(EstimationMode::VarBootstrap),
            "var_cholesky" | "cholesky" => Ok(EstimationMode::VarCholesky),
            other => Err(RequestError::invalid(
                "estimation",
                format!("unknown mode '{}'", other),
            )),
        }
    }
}

/// Whether primary-balance shocks are switched off inside the adjustment
/// window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PolicyWindow {
    /// Zero primary-balance shocks for draw steps inside the window.
    #[default]
    ApplyZeroing,
    /// The adjustment is already reflected elsewhere; leave shocks alone.
    AlreadyEmbedded,
}

/// Exchange-rate regime of the simulated country.
///
/// Decides which exchange-rate column is excluded from VAR fitting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CurrencyRegime {
    /// Both exchange-rate channels are estimated.
    #[default]
    Floating,
    /// Shared-currency member: no euro exchange-rate channel.
    EuroArea,
    /// Reserve-currency issuer: no US dollar exchange-rate channel.
    ReserveCurrency,
}

impl CurrencyRegime {
    /// Shock column dropped before VAR fitting, if any.
    pub fn dropped_variable(self) -> Option<ShockVariable> {
        match self {
            CurrencyRegime::Floating => None,
            CurrencyRegime::EuroArea => Some(ShockVariable::ExrEur),
            CurrencyRegime::ReserveCurrency => Some(ShockVariable::ExrUsd),
        }
    }
}

impl FromStr for CurrencyRegime {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "floating" => Ok(CurrencyRegime::Floating),
            "euro_area" | "euro" => Ok(CurrencyRegime::EuroArea),
            "reserve_currency" | "reserve" => Ok(CurrencyRegime::ReserveCurrency),
            other => Err(RequestError::invalid(
                "currency_regime",
                format!("unknown regime '{}'", other),
            )),
        }
    }
}

/// Immutable input of one simulation run.
///
/// Indices (`stochastic_start`, `adjustment_end`) refer to positions in the
/// baseline projection arrays; index 0 is the projection start year.
///
/// # Examples
///
/// ```
/// use dsa_core::types::DebtComposition;
/// use dsa_stochastic::{EstimationMode, SimulationRequest};
///
/// let request = SimulationRequest::builder()
///     .n_paths(10_000)
///     .stochastic_start(5)
///     .horizon(5)
///     .mode(EstimationMode::VarBootstrap)
///     .adjustment_end(4)
///     .composition(DebtComposition::domestic_only(0.2).unwrap())
///     .avg_res_mat(7.5)
///     .seed(42)
///     .build()
///     .unwrap();
///
/// assert_eq!(request.stochastic_end(), 9);
/// assert_eq!(request.pb_zero_years(), 0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationRequest {
    n_paths: usize,
    horizon: usize,
    stochastic_start: usize,
    mode: EstimationMode,
    currency_regime: CurrencyRegime,
    policy_window: PolicyWindow,
    adjustment_end: Option<usize>,
    composition: DebtComposition,
    avg_res_mat: f64,
    seed: Option<u64>,
}

impl SimulationRequest {
    /// Start building a request.
    #[inline]
    pub fn builder() -> SimulationRequestBuilder {
        SimulationRequestBuilder::default()
    }

    /// Number of simulated paths.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Stochastic horizon in years.
    #[inline]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Baseline index of the first stochastic year.
    #[inline]
    pub fn stochastic_start(&self) -> usize {
        self.stochastic_start
    }

    /// Baseline index of the last stochastic year.
    #[inline]
    pub fn stochastic_end(&self) -> usize {
        self.stochastic_start + self.horizon - 1
    }

    /// Estimation mode.
    #[inline]
    pub fn mode(&self) -> EstimationMode {
        self.mode
    }

    /// Currency regime.
    #[inline]
    pub fn currency_regime(&self) -> CurrencyRegime {
        self.currency_regime
    }

    /// Policy window handling.
    #[inline]
    pub fn policy_window(&self) -> PolicyWindow {
        self.policy_window
    }

    /// Baseline index of the last adjustment year, if any.
    #[inline]
    pub fn adjustment_end(&self) -> Option<usize> {
        self.adjustment_end
    }

    /// Debt composition.
    #[inline]
    pub fn composition(&self) -> &DebtComposition {
        &self.composition
    }

    /// Average residual maturity of the debt stock in years.
    #[inline]
    pub fn avg_res_mat(&self) -> f64 {
        self.avg_res_mat
    }

    /// Injected seed, if any.
    #[inline]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Number of stochastic years that overlap the adjustment period.
    ///
    /// `adjustment_end − stochastic_start + 1`, floored at zero. Always zero
    /// for [`PolicyWindow::AlreadyEmbedded`] or when no adjustment end is set.
    pub fn pb_zero_years(&self) -> usize {
        match (self.policy_window, self.adjustment_end) {
            (PolicyWindow::ApplyZeroing, Some(end)) => {
                (end + 1).saturating_sub(self.stochastic_start)
            }
            _ => 0,
        }
    }

    /// Number of leading draw steps whose primary-balance shock is zeroed.
    pub fn pb_zero_steps(&self, frequency: ShockFrequency) -> usize {
        frequency
            .draw_steps(self.pb_zero_years())
            .min(frequency.draw_steps(self.horizon))
    }

    /// Checks that the stochastic window fits a baseline of the given length.
    ///
    /// The window needs one pre-stochastic year, so `stochastic_start ≥ 1`.
    pub fn check_window(&self, baseline_len: usize) -> Result<(), RequestError> {
        let end = self.stochastic_end();
        if self.stochastic_start == 0 || end >= baseline_len {
            return Err(RequestError::WindowOutOfRange {
                start: self.stochastic_start,
                end,
                baseline_len,
            });
        }
        Ok(())
    }

    /// Validate the request.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.n_paths == 0 || self.n_paths > MAX_PATHS {
            return Err(RequestError::InvalidPathCount(self.n_paths));
        }
        if self.horizon == 0 {
            return Err(RequestError::EmptyHorizon);
        }
        if self.stochastic_start == 0 {
            return Err(RequestError::invalid(
                "stochastic_start",
                "must leave one pre-stochastic baseline year",
            ));
        }
        if !(self.avg_res_mat.is_finite() && self.avg_res_mat > 0.0) {
            return Err(RequestError::invalid(
                "avg_res_mat",
                format!("must be positive, got {}", self.avg_res_mat),
            ));
        }
        self.composition
            .validate()
            .map_err(|e| RequestError::invalid("composition", e.to_string()))
    }

    /// Copy of this request over a different stochastic window.
    pub(crate) fn with_window(&self, stochastic_start: usize, horizon: usize) -> Self {
        Self {
            stochastic_start,
            horizon,
            ..self.clone()
        }
    }

    /// Copy of this request with another estimation mode.
    pub(crate) fn with_mode(&self, mode: EstimationMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }
}

/// Builder for [`SimulationRequest`].
#[derive(Clone, Debug, Default)]
pub struct SimulationRequestBuilder {
    n_paths: Option<usize>,
    horizon: Option<usize>,
    stochastic_start: Option<usize>,
    mode: EstimationMode,
    currency_regime: CurrencyRegime,
    policy_window: PolicyWindow,
    adjustment_end: Option<usize>,
    composition: Option<DebtComposition>,
    avg_res_mat: Option<f64>,
    seed: Option<u64>,
}

impl SimulationRequestBuilder {
    /// Number of simulated paths.
    #[inline]
    pub fn n_paths(mut self, n_paths: usize) -> Self {
        self.n_paths = Some(n_paths);
        self
    }

    /// Stochastic horizon in years (default 5).
    #[inline]
    pub fn horizon(mut self, horizon: usize) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Baseline index of the first stochastic year.
    #[inline]
    pub fn stochastic_start(mut self, index: usize) -> Self {
        self.stochastic_start = Some(index);
        self
    }

    /// Estimation mode (default normal).
    #[inline]
    pub fn mode(mut self, mode: EstimationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Currency regime (default floating).
    #[inline]
    pub fn currency_regime(mut self, regime: CurrencyRegime) -> Self {
        self.currency_regime = regime;
        self
    }

    /// Policy window handling (default zeroing).
    #[inline]
    pub fn policy_window(mut self, window: PolicyWindow) -> Self {
        self.policy_window = window;
        self
    }

    /// Baseline index of the last adjustment year.
    #[inline]
    pub fn adjustment_end(mut self, index: usize) -> Self {
        self.adjustment_end = Some(index);
        self
    }

    /// Debt composition.
    #[inline]
    pub fn composition(mut self, composition: DebtComposition) -> Self {
        self.composition = Some(composition);
        self
    }

    /// Average residual maturity in years.
    #[inline]
    pub fn avg_res_mat(mut self, years: f64) -> Self {
        self.avg_res_mat = Some(years);
        self
    }

    /// Seed for reproducible draws.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Optional seed; `None` draws from entropy.
    #[inline]
    pub fn maybe_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Build and validate the request.
    pub fn build(self) -> Result<SimulationRequest, RequestError> {
        let n_paths = self
            .n_paths
            .ok_or_else(|| RequestError::invalid("n_paths", "must be specified"))?;
        let stochastic_start = self
            .stochastic_start
            .ok_or_else(|| RequestError::invalid("stochastic_start", "must be specified"))?;
        let composition = self
            .composition
            .ok_or_else(|| RequestError::invalid("composition", "must be specified"))?;
        let avg_res_mat = self
            .avg_res_mat
            .ok_or_else(|| RequestError::invalid("avg_res_mat", "must be specified"))?;

        let request = SimulationRequest {
            n_paths,
            horizon: self.horizon.unwrap_or(DEFAULT_HORIZON),
            stochastic_start,
            mode: self.mode,
            currency_regime: self.currency_regime,
            policy_window: self.policy_window,
            adjustment_end: self.adjustment_end,
            composition,
            avg_res_mat,
            seed: self.seed,
        };

        request.validate()?;
        Ok(request)
    }
}
