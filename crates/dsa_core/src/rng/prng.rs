//! Pseudo-random number generator wrapper.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// Simulation random number generator.
///
/// Wraps a seeded `StdRng` and remembers the seed so that a run started
/// from entropy can still be reproduced from its logs.
///
/// # Examples
///
/// ```rust
/// use dsa_core::rng::DsaRng;
///
/// let mut rng1 = DsaRng::from_seed(7);
/// let mut rng2 = DsaRng::from_seed(7);
/// assert_eq!(rng1.gen_normal(), rng2.gen_normal());
/// assert_eq!(rng1.seed(), 7);
/// ```
#[derive(Clone, Debug)]
pub struct DsaRng {
    inner: StdRng,
    seed: u64,
}

impl DsaRng {
    /// Creates a generator initialised with the given seed.
    #[inline]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Creates a generator from a freshly drawn entropy seed.
    ///
    /// The seed is kept and available through [`DsaRng::seed`].
    pub fn from_entropy() -> Self {
        Self::from_seed(rand::random())
    }

    /// Creates a seeded generator, or an entropy-seeded one for `None`.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::from_entropy(),
        }
    }

    /// Returns the seed used for initialisation.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generates a uniform value in [0, 1).
    #[inline]
    pub fn gen_uniform(&mut self) -> f64 {
        self.inner.gen()
    }

    /// Generates a standard normal variate.
    #[inline]
    pub fn gen_normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.inner)
    }

    /// Generates a uniform index in `0..n`.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    #[inline]
    pub fn gen_index(&mut self, n: usize) -> usize {
        self.inner.gen_range(0..n)
    }

    /// Fills the buffer with standard normal variates.
    #[inline]
    pub fn fill_normal(&mut self, buffer: &mut [f64]) {
        for value in buffer.iter_mut() {
            *value = StandardNormal.sample(&mut self.inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = DsaRng::from_seed(42);
        let mut b = DsaRng::from_seed(42);
        let mut buf_a = vec![0.0; 64];
        let mut buf_b = vec![0.0; 64];
        a.fill_normal(&mut buf_a);
        b.fill_normal(&mut buf_b);
        assert_eq!(buf_a, buf_b);
        assert_eq!(a.gen_index(17), b.gen_index(17));
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a = DsaRng::from_seed(1);
        let mut b = DsaRng::from_seed(2);
        assert_ne!(a.gen_uniform(), b.gen_uniform());
    }

    #[test]
    fn test_entropy_seed_is_recorded() {
        let mut rng = DsaRng::from_entropy();
        let mut replay = DsaRng::from_seed(rng.seed());
        assert_eq!(rng.gen_normal(), replay.gen_normal());
    }

    #[test]
    fn test_optional_seed() {
        assert_eq!(DsaRng::from_optional_seed(Some(9)).seed(), 9);
    }

    #[test]
    fn test_gen_index_in_range() {
        let mut rng = DsaRng::from_seed(3);
        for _ in 0..1000 {
            assert!(rng.gen_index(5) < 5);
        }
    }

    #[test]
    fn test_uniform_in_unit_interval() {
        let mut rng = DsaRng::from_seed(11);
        for _ in 0..1000 {
            let u = rng.gen_uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn test_normal_sample_moments() {
        let mut rng = DsaRng::from_seed(2024);
        let mut buf = vec![0.0; 20_000];
        rng.fill_normal(&mut buf);
        let mean = buf.iter().sum::<f64>() / buf.len() as f64;
        let var = buf.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / buf.len() as f64;
        assert!(mean.abs() < 0.05);
        assert!((var - 1.0).abs() < 0.05);
    }
}
