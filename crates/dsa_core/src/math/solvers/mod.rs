//! Bounded scalar minimisation.
//!
//! The policy calibration searches a single scalar over a closed interval.
//! [`BoundedBrentMinimiser`] implements Brent's bounded method (golden
//! section search with parabolic interpolation), configured through
//! [`MinimiserConfig`].
//!
//! ## Example
//!
//! ```
//! use dsa_core::math::solvers::{BoundedBrentMinimiser, MinimiserConfig};
//!
//! let minimiser = BoundedBrentMinimiser::new(MinimiserConfig::default());
//! let result = minimiser.minimise(|x| (x - 1.5).powi(2), -5.0, 5.0).unwrap();
//!
//! assert!(result.converged);
//! assert!((result.x - 1.5).abs() < 1e-4);
//! ```

mod bounded_brent;
mod config;

pub use bounded_brent::{BoundedBrentMinimiser, MinimiseResult};
pub use config::MinimiserConfig;
