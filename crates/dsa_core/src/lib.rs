//! # dsa_core: Foundation for Stochastic Debt Sustainability Analysis
//!
//! ## Layer 1 (Foundation) Role
//!
//! dsa_core is the bottom layer of the workspace, providing:
//! - Shock variable definitions and historical shock panels (`types::shock`, `types::panel`)
//! - Deterministic baseline paths and debt composition (`types::baseline`)
//! - Error types: `DataError`, `EstimationError`, `SolverError` (`types::error`)
//! - Covariance, PSD and Cholesky factors, OLS (`math::linalg`)
//! - Quantiles and rounding helpers (`math::stats`)
//! - Bounded scalar minimisation (`math::solvers`)
//! - Seeded random number generation (`rng`)
//!
//! ## Usage Examples
//!
//! ```rust
//! use dsa_core::types::{ShockFrequency, ShockPanel, ShockVariable};
//!
//! let panel = ShockPanel::new(
//!     ShockFrequency::Annual,
//!     vec!["2001".into(), "2002".into(), "2003".into()],
//!     vec![
//!         [0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
//!         [0.2, 0.1, 0.0, 0.5, 0.4, 0.3],
//!         [0.0, 0.3, 0.2, 0.1, 0.6, 0.5],
//!     ],
//! )
//! .unwrap();
//!
//! assert_eq!(panel.len(), 3);
//! assert_eq!(panel.column(ShockVariable::PrimaryBalance), vec![0.6, 0.3, 0.5]);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for shock variables, frequencies and baselines

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod math;
pub mod rng;
pub mod types;
