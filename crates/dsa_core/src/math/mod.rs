//! Numerical kernels for shock estimation, sampling and calibration.
//!
//! - [`linalg`]: covariance matrices, matrix factors, least squares
//! - [`stats`]: means, quantiles, rounding
//! - [`solvers`]: bounded scalar minimisation

pub mod linalg;
pub mod solvers;
pub mod stats;
