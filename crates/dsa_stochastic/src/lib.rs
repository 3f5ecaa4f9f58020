//! # dsa_stochastic: Stochastic Debt Sustainability Engine (L2)
//!
//! Propagates correlated macro-fiscal shocks through the debt-dynamics
//! recurrence and calibrates the structural primary balance against
//! ensemble risk probabilities.
//!
//! ## Pipeline
//!
//! ```text
//! ShockPanel ─► estimator ─► sampler ─► aggregator ─► simulator ─► risk
//!                                                        ▲           │
//!                        BaselineProjector ──────────────┴─ calibrator
//! ```
//!
//! - [`estimator`]: normal or VAR(1) shock model fitted to the panel
//! - [`sampler`]: raw draws at the panel frequency
//! - [`aggregator`]: annual shocks with long-term rate weighting
//! - [`simulator`]: baseline combination and debt recurrence
//! - [`risk`]: declines, stable and below-60 probabilities
//! - [`calibrator`]: bounded search for the policy lever
//! - [`binding`]: most demanding of several policy requirements
//! - [`fanchart`], [`deficit`]: percentile bands and excessive-deficit
//!   probabilities
//!
//! ## Usage
//!
//! ```rust
//! use dsa_core::types::{BaselinePaths, DebtComposition, ShockFrequency, ShockPanel};
//! use dsa_stochastic::{simulate, RiskCriterion, RiskEstimator, SimulationRequest};
//!
//! let periods = (1990..2020).map(|y| y.to_string()).collect();
//! let rows = (0..30)
//!     .map(|i| {
//!         let x = (i as f64 * 0.7).sin();
//!         [0.0, 0.0, 0.3 * x, 0.2 * x, -0.5 * x, 0.4 * x]
//!     })
//!     .collect();
//! let panel = ShockPanel::new(ShockFrequency::Annual, periods, rows).unwrap();
//!
//! let n = 10;
//! let baseline = BaselinePaths {
//!     start_year: 2024,
//!     debt: vec![90.0; n],
//!     exr_eur: vec![1.0; n],
//!     exr_usd: vec![1.0; n],
//!     implicit_rate: vec![3.0; n],
//!     growth: vec![3.5; n],
//!     primary_balance: vec![0.5; n],
//!     stock_flow: vec![0.0; n],
//!     overall_balance: vec![-2.2; n],
//! };
//!
//! let request = SimulationRequest::builder()
//!     .n_paths(1_000)
//!     .stochastic_start(2)
//!     .composition(DebtComposition::domestic_only(0.25).unwrap())
//!     .avg_res_mat(7.0)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! let result = simulate(&request, &panel, &baseline).unwrap();
//! let risk = RiskEstimator::new(vec![RiskCriterion::Declines, RiskCriterion::Stable], 0);
//! let probs = risk.evaluate(&result.paths.debt).unwrap();
//! assert!(probs.declines.unwrap() > 0.5);
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` (default): simulate paths in parallel with rayon
//! - `serde`: serialisation of configurations and outputs

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod aggregator;
pub mod binding;
pub mod calibrator;
pub mod deficit;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod fanchart;
pub mod request;
pub mod risk;
pub mod sampler;
pub mod simulator;

pub use aggregator::{AnnualChannel, AnnualShockEnsemble};
pub use binding::{BindingScenario, BindingScenarioSelector};
pub use calibrator::{
    BaselineProjector, CalibrationConfig, CalibrationResult, OptimisationTrace,
    StochasticCalibrator, TrialRecord,
};
pub use deficit::{excessive_deficit_probability, DeficitRequest, DeficitResult};
pub use engine::{simulate, SimulationResult};
pub use error::{ProjectionError, RequestError, StochasticError};
pub use estimator::FittedShockModel;
pub use fanchart::{FanChart, PathVariable};
pub use request::{CurrencyRegime, EstimationMode, PolicyWindow, SimulationRequest};
pub use risk::{RiskCriterion, RiskEstimator, RiskProbabilities};
pub use sampler::ShockEnsemble;
pub use simulator::{PathMatrix, SimulatedPathSet};
