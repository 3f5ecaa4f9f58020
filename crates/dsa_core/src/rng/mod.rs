//! # Random Number Generation
//!
//! Seeded pseudo-random number generation for shock sampling.
//!
//! Every simulation run owns exactly one [`DsaRng`]. Draws are consumed in
//! a fixed order (path, then step, then variable), so a given seed always
//! reproduces the same ensemble.
//!
//! ## Usage Example
//!
//! ```rust
//! use dsa_core::rng::DsaRng;
//!
//! let mut rng = DsaRng::from_seed(12345);
//! let z = rng.gen_normal();
//! let row = rng.gen_index(40);
//! assert!(row < 40);
//!
//! let mut buffer = vec![0.0; 6];
//! rng.fill_normal(&mut buffer);
//! ```

mod prng;

pub use prng::DsaRng;
