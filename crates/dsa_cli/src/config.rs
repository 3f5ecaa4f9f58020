//! Run configuration management
//!
//! Loads a run configuration from a TOML file, then applies environment
//! variable and CLI overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use dsa_core::math::solvers::MinimiserConfig;
use dsa_core::types::{BaselinePaths, DebtComposition, ShockFrequency};
use dsa_stochastic::calibrator::{DEFAULT_BOUNDS, DEFAULT_TARGET};
use dsa_stochastic::{
    CalibrationConfig, CurrencyRegime, DeficitRequest, EstimationMode, PolicyWindow,
    RequestError, RiskCriterion, SimulationRequest,
};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the seed.
pub const ENV_SEED: &str = "DSA_SEED";
/// Environment variable overriding the path count.
pub const ENV_PATHS: &str = "DSA_PATHS";
/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "DSA_LOG_LEVEL";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Configuration file error: {0}")]
    FileError(String),

    #[error("Environment variable error: {0}")]
    EnvError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] RequestError),
}

/// Log levels accepted in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    LogLevel::from_str(&s).map_err(serde::de::Error::custom)
}

/// Where the shock panel comes from.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// ISO code selecting rows of the shock files.
    pub country: String,
    /// Quarterly shock file.
    #[serde(default)]
    pub quarterly: Option<PathBuf>,
    /// Annual shock file.
    #[serde(default)]
    pub annual: Option<PathBuf>,
    /// Requested draw frequency.
    #[serde(default)]
    pub frequency: ShockFrequency,
    /// First year of the shock sample.
    #[serde(default = "default_sample_start")]
    pub sample_start: i32,
    /// Clip each shock column to its 5th–95th percentile range.
    #[serde(default = "default_true")]
    pub winsorize: bool,
}

fn default_sample_start() -> i32 {
    2000
}

fn default_true() -> bool {
    true
}

/// Simulation request parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_n_paths")]
    pub n_paths: usize,
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    pub stochastic_start: usize,
    #[serde(default)]
    pub mode: EstimationMode,
    #[serde(default)]
    pub currency_regime: CurrencyRegime,
    #[serde(default)]
    pub policy_window: PolicyWindow,
    #[serde(default)]
    pub adjustment_end: Option<usize>,
    pub composition: DebtComposition,
    pub avg_res_mat: f64,
}

fn default_n_paths() -> usize {
    100_000
}

fn default_horizon() -> usize {
    dsa_stochastic::request::DEFAULT_HORIZON
}

/// Calibration parameters and the linear adjustment the policy drives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalibrationSection {
    pub target: f64,
    pub bounds: (f64, f64),
    pub criteria: Vec<RiskCriterion>,
    pub criterion_start: usize,
    /// Baseline index of the first adjustment year.
    pub adjustment_start: usize,
    /// Number of adjustment years.
    pub adjustment_period: usize,
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Deterministic policy requirements competing for the binding scenario.
    pub deterministic: BTreeMap<String, f64>,
}

impl Default for CalibrationSection {
    fn default() -> Self {
        let minimiser = MinimiserConfig::default();
        Self {
            target: DEFAULT_TARGET,
            bounds: DEFAULT_BOUNDS,
            criteria: vec![RiskCriterion::Declines, RiskCriterion::Below60],
            criterion_start: 0,
            adjustment_start: 1,
            adjustment_period: 4,
            tolerance: minimiser.tolerance,
            max_iterations: minimiser.max_iterations,
            deterministic: BTreeMap::new(),
        }
    }
}

impl CalibrationSection {
    /// Baseline index of the last adjustment year.
    pub fn adjustment_end(&self) -> usize {
        self.adjustment_start + self.adjustment_period.max(1) - 1
    }

    /// Engine calibration configuration.
    pub fn to_calibration_config(&self) -> Result<CalibrationConfig, RequestError> {
        CalibrationConfig::builder()
            .bounds(self.bounds.0, self.bounds.1)
            .target(self.target)
            .criteria(self.criteria.clone())
            .criterion_start(self.criterion_start)
            .minimiser(MinimiserConfig::new(self.tolerance, self.max_iterations))
            .build()
    }
}

/// Complete configuration of one run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default, deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    #[serde(default)]
    pub seed: Option<u64>,
    pub data: DataConfig,
    pub simulation: SimulationConfig,
    pub baseline: BaselinePaths,
    #[serde(default)]
    pub calibration: CalibrationSection,
    #[serde(default)]
    pub deficit: Option<DeficitRequest>,
}

impl RunConfig {
    /// Parse a configuration from TOML text.
    ///
    /// Relative data paths are resolved against `base_dir`.
    pub fn from_toml_str(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: RunConfig = toml::from_str(content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))?;
        config.data.quarterly = config.data.quarterly.map(|p| base_dir.join(p));
        config.data.annual = config.data.annual.map(|p| base_dir.join(p));
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let config = Self::from_toml_str(&content, base_dir)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(seed) = lookup(ENV_SEED) {
            self.seed = Some(seed.trim().parse().map_err(|_| {
                ConfigError::EnvError(format!("{} must be an unsigned integer, got '{}'", ENV_SEED, seed))
            })?);
        }
        if let Some(paths) = lookup(ENV_PATHS) {
            self.simulation.n_paths = paths.trim().parse().map_err(|_| {
                ConfigError::EnvError(format!("{} must be a path count, got '{}'", ENV_PATHS, paths))
            })?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = LogLevel::from_str(&level)?;
        }
        Ok(())
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) {
        if let Some(seed) = cli.seed {
            self.seed = Some(seed);
        }
        if let Some(n_paths) = cli.n_paths {
            self.simulation.n_paths = n_paths;
        }
        if cli.verbose {
            self.log_level = LogLevel::Debug;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.quarterly.is_none() && self.data.annual.is_none() {
            return Err(ConfigError::FileError(
                "at least one of data.quarterly or data.annual must be set".to_string(),
            ));
        }
        self.baseline
            .validate()
            .map_err(|e| RequestError::invalid("baseline", e.to_string()))?;
        self.simulation_request()?.check_window(self.baseline.len())?;
        if let Some(deficit) = &self.deficit {
            deficit.validate()?;
        }
        Ok(())
    }

    /// Engine request built from the simulation section.
    pub fn simulation_request(&self) -> Result<SimulationRequest, RequestError> {
        self.request_with_adjustment_end(self.simulation.adjustment_end)
    }

    /// Engine request whose adjustment window defaults to the calibration
    /// window.
    pub fn calibration_request(&self) -> Result<SimulationRequest, RequestError> {
        let end = self
            .simulation
            .adjustment_end
            .unwrap_or_else(|| self.calibration.adjustment_end());
        self.request_with_adjustment_end(Some(end))
    }

    fn request_with_adjustment_end(
        &self,
        adjustment_end: Option<usize>,
    ) -> Result<SimulationRequest, RequestError> {
        let sim = &self.simulation;
        let mut builder = SimulationRequest::builder()
            .n_paths(sim.n_paths)
            .horizon(sim.horizon)
            .stochastic_start(sim.stochastic_start)
            .mode(sim.mode)
            .currency_regime(sim.currency_regime)
            .policy_window(sim.policy_window)
            .composition(sim.composition)
            .avg_res_mat(sim.avg_res_mat)
            .maybe_seed(self.seed);
        if let Some(end) = adjustment_end {
            builder = builder.adjustment_end(end);
        }
        builder.build()
    }
}

/// CLI arguments structure
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Config file path
    pub config_file: PathBuf,
    /// Seed override
    pub seed: Option<u64>,
    /// Path count override
    pub n_paths: Option<usize>,
    /// Raise the log level to debug
    pub verbose: bool,
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Config file
/// 4. Default values
pub fn build_config(cli: &CliArgs) -> Result<RunConfig, ConfigError> {
    let mut config = RunConfig::from_file(&cli.config_file)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    config.merge_with_cli(cli);
    config.validate()?;
    Ok(config)
}
