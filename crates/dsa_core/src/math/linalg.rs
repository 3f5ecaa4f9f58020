//! Dense linear algebra for the shock model.
//!
//! - [`CovarianceMatrix`]: symmetric covariance with sample estimation
//! - [`MatrixFactor`]: square factor `F` with `F · Fᵀ = Σ`, used to turn
//!   independent standard normals into correlated draws
//! - [`least_squares`]: ordinary least squares for the lag regression
//!
//! Matrices are stored row-major in flat `Vec<f64>` buffers. The eigen and
//! SVD decompositions are delegated to `nalgebra`.

use nalgebra::{DMatrix, SymmetricEigen};

use crate::types::EstimationError;

/// Symmetric covariance matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct CovarianceMatrix {
    /// Matrix elements (row-major)
    data: Vec<f64>,
    /// Matrix dimension
    dim: usize,
}

impl CovarianceMatrix {
    /// Sample covariance of row-major observations with `dim` columns.
    ///
    /// Uses the unbiased denominator `n − 1`.
    ///
    /// # Errors
    ///
    /// - `EstimationError::InvalidDimensions` if `data.len()` is not a
    ///   multiple of `dim`
    /// - `EstimationError::InsufficientObservations` for fewer than two rows
    ///
    /// # Examples
    ///
    /// ```
    /// use dsa_core::math::linalg::CovarianceMatrix;
    ///
    /// let obs = [1.0, 2.0, 3.0, 6.0];
    /// let cov = CovarianceMatrix::sample(&obs, 2).unwrap();
    /// assert_eq!(cov.get(0, 0), 2.0);
    /// assert_eq!(cov.get(0, 1), 4.0);
    /// ```
    pub fn sample(data: &[f64], dim: usize) -> Result<Self, EstimationError> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(EstimationError::InvalidDimensions {
                expected: dim * (data.len() / dim.max(1)),
                got: data.len(),
            });
        }
        let n = data.len() / dim;
        if n < 2 {
            return Err(EstimationError::InsufficientObservations { got: n, need: 2 });
        }

        let mut means = vec![0.0; dim];
        for row in data.chunks_exact(dim) {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in means.iter_mut() {
            *m /= n as f64;
        }

        let mut cov = vec![0.0; dim * dim];
        for row in data.chunks_exact(dim) {
            for i in 0..dim {
                let di = row[i] - means[i];
                for j in i..dim {
                    cov[i * dim + j] += di * (row[j] - means[j]);
                }
            }
        }
        let denom = (n - 1) as f64;
        for i in 0..dim {
            for j in i..dim {
                let v = cov[i * dim + j] / denom;
                cov[i * dim + j] = v;
                cov[j * dim + i] = v;
            }
        }

        Ok(Self { data: cov, dim })
    }

    /// All-zero matrix.
    pub fn zeros(dim: usize) -> Self {
        Self {
            data: vec![0.0; dim * dim],
            dim,
        }
    }

    /// Builds a matrix from row-major elements.
    ///
    /// # Errors
    ///
    /// `EstimationError::InvalidDimensions` if `data.len() != dim²`.
    pub fn from_row_major(data: Vec<f64>, dim: usize) -> Result<Self, EstimationError> {
        if data.len() != dim * dim {
            return Err(EstimationError::InvalidDimensions {
                expected: dim * dim,
                got: data.len(),
            });
        }
        Ok(Self { data, dim })
    }

    /// Matrix dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Element at (i, j).
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.dim + j]
    }

    /// Row-major elements.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Lower triangular Cholesky factor `L` with `L · Lᵀ = Σ`.
    ///
    /// # Errors
    ///
    /// `EstimationError::NotPositiveDefinite` if a pivot is not strictly
    /// positive.
    pub fn cholesky(&self) -> Result<MatrixFactor, EstimationError> {
        let n = self.dim;
        let mut lower = vec![0.0; n * n];

        for i in 0..n {
            for j in 0..=i {
                let mut sum = 0.0;

                if j == i {
                    for k in 0..j {
                        let l_jk = lower[j * n + k];
                        sum += l_jk * l_jk;
                    }
                    let diag = self.get(j, j) - sum;
                    if diag <= 0.0 || !diag.is_finite() {
                        return Err(EstimationError::NotPositiveDefinite {
                            pivot: j,
                            value: diag,
                        });
                    }
                    lower[j * n + j] = diag.sqrt();
                } else {
                    for k in 0..j {
                        sum += lower[i * n + k] * lower[j * n + k];
                    }
                    lower[i * n + j] = (self.get(i, j) - sum) / lower[j * n + j];
                }
            }
        }

        Ok(MatrixFactor {
            data: lower,
            dim: n,
        })
    }

    /// Square-root factor that tolerates singular matrices.
    ///
    /// Variables with zero variance get an all-zero row, so they receive
    /// exactly-zero draws. The remaining block is factored as
    /// `V · diag(√max(λ, 0))` from its symmetric eigen decomposition.
    pub fn psd_factor(&self) -> MatrixFactor {
        let n = self.dim;
        let active: Vec<usize> = (0..n).filter(|&i| self.get(i, i) > 0.0).collect();
        let mut factor = vec![0.0; n * n];

        if !active.is_empty() {
            let m = active.len();
            let block = DMatrix::from_fn(m, m, |r, c| self.get(active[r], active[c]));
            let eigen = SymmetricEigen::new(block);
            for (r, &i) in active.iter().enumerate() {
                for (c, &j) in active.iter().enumerate() {
                    let scale = eigen.eigenvalues[c].max(0.0).sqrt();
                    factor[i * n + j] = eigen.eigenvectors[(r, c)] * scale;
                }
            }
        }

        MatrixFactor { data: factor, dim: n }
    }
}

/// Square factor of a covariance matrix.
///
/// Maps independent standard normals `z` to correlated draws `F · z`.
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixFactor {
    data: Vec<f64>,
    dim: usize,
}

impl MatrixFactor {
    /// Factor dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Element at (i, j).
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.dim + j]
    }

    /// Computes `F · z`.
    ///
    /// # Panics
    ///
    /// Panics if `z.len() < self.dim()`.
    pub fn transform(&self, z: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.dim];
        self.transform_into(z, &mut out);
        out
    }

    /// Computes `F · z` into a caller-provided buffer.
    ///
    /// # Panics
    ///
    /// Panics if `z` or `out` is shorter than the factor dimension.
    pub fn transform_into(&self, z: &[f64], out: &mut [f64]) {
        assert!(
            z.len() >= self.dim && out.len() >= self.dim,
            "Input vector length {} is less than matrix dimension {}",
            z.len().min(out.len()),
            self.dim
        );
        for (i, o) in out.iter_mut().take(self.dim).enumerate() {
            let row = &self.data[i * self.dim..(i + 1) * self.dim];
            *o = row.iter().zip(z).map(|(f, z)| f * z).sum();
        }
    }
}

/// Ordinary least squares `Y ≈ X · B`.
///
/// `x` is `n_obs × n_reg` and `y` is `n_obs × n_out`, both row-major.
/// Returns `B` (`n_reg × n_out`, row-major).
///
/// # Errors
///
/// - `EstimationError::InvalidDimensions` if a buffer has the wrong length
/// - `EstimationError::InsufficientObservations` if `n_obs < n_reg`
/// - `EstimationError::SingularRegressors` if `X` is rank deficient
pub fn least_squares(
    x: &[f64],
    y: &[f64],
    n_obs: usize,
    n_reg: usize,
    n_out: usize,
) -> Result<Vec<f64>, EstimationError> {
    if x.len() != n_obs * n_reg {
        return Err(EstimationError::InvalidDimensions {
            expected: n_obs * n_reg,
            got: x.len(),
        });
    }
    if y.len() != n_obs * n_out {
        return Err(EstimationError::InvalidDimensions {
            expected: n_obs * n_out,
            got: y.len(),
        });
    }
    if n_obs < n_reg {
        return Err(EstimationError::InsufficientObservations {
            got: n_obs,
            need: n_reg,
        });
    }

    let x_mat = DMatrix::from_row_slice(n_obs, n_reg, x);
    let y_mat = DMatrix::from_row_slice(n_obs, n_out, y);

    let svd = x_mat.svd(true, true);
    let largest = svd.singular_values.max();
    let eps = largest * n_obs.max(n_reg) as f64 * f64::EPSILON;
    if largest <= 0.0 || svd.rank(eps) < n_reg {
        return Err(EstimationError::SingularRegressors);
    }
    let b = svd
        .solve(&y_mat, eps)
        .map_err(|_| EstimationError::SingularRegressors)?;

    let mut out = Vec::with_capacity(n_reg * n_out);
    for i in 0..n_reg {
        for j in 0..n_out {
            out.push(b[(i, j)]);
        }
    }
    Ok(out)
}
