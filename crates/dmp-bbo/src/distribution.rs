//! Gaussian distribution over parameter vectors.

use dmp_core::{DmpError, DmpResult, Real};
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Relative tolerance for symmetry and for eigenvalues just below zero.
const PSD_TOLERANCE: Real = 1e-10;

/// Multivariate normal distribution with a positive semi-definite covariance.
///
/// Distributions are immutable: updaters return a new one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    mean: DVector<Real>,
    covar: DMatrix<Real>,
}

impl Distribution {
    /// # Errors
    ///
    /// `InvalidParameter` if the covariance is not `n x n` for a mean of
    /// length `n`, contains non-finite values, is not symmetric, or has a
    /// negative eigenvalue.
    pub fn new(mean: DVector<Real>, covar: DMatrix<Real>) -> DmpResult<Self> {
        let n = mean.len();
        if n == 0 {
            return Err(DmpError::invalid_parameter("distribution mean must not be empty"));
        }
        if covar.shape() != (n, n) {
            return Err(DmpError::invalid_parameter(format!(
                "covariance is {}x{}, expected {n}x{n}",
                covar.nrows(),
                covar.ncols()
            )));
        }
        if mean.iter().chain(covar.iter()).any(|v| !v.is_finite()) {
            return Err(DmpError::invalid_parameter("distribution contains non-finite values"));
        }
        let scale = covar.amax().max(1.0);
        if (&covar - covar.transpose()).amax() > PSD_TOLERANCE * scale {
            return Err(DmpError::invalid_parameter("covariance is not symmetric"));
        }
        let distribution = Self { mean, covar };
        distribution.sampling_factor()?;
        Ok(distribution)
    }

    /// Distribution with covariance `variance * I`.
    pub fn isotropic(mean: DVector<Real>, variance: Real) -> DmpResult<Self> {
        let n = mean.len();
        Self::new(mean, DMatrix::identity(n, n) * variance)
    }

    pub fn mean(&self) -> &DVector<Real> {
        &self.mean
    }

    pub fn covar(&self) -> &DMatrix<Real> {
        &self.covar
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Largest eigenvalue of the covariance; its square root summarizes the
    /// exploration magnitude.
    pub fn max_eigen_value(&self) -> Real {
        self.covar.clone().symmetric_eigen().eigenvalues.max()
    }

    /// Draw `n` samples, one per row.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the covariance is not positive semi-definite.
    pub fn generate_samples<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> DmpResult<DMatrix<Real>> {
        let factor = self.sampling_factor()?;
        let dim = self.dim();
        let normal = DMatrix::from_fn(n, dim, |_, _| rng.sample::<Real, _>(StandardNormal));
        let mut samples = normal * factor.transpose();
        for mut row in samples.row_iter_mut() {
            row += self.mean.transpose();
        }
        Ok(samples)
    }

    /// `A` with `A A^T = covar`, from the symmetric eigendecomposition so that
    /// singular covariances are accepted.
    fn sampling_factor(&self) -> DmpResult<DMatrix<Real>> {
        let eigen = self.covar.clone().symmetric_eigen();
        let scale = eigen.eigenvalues.amax().max(1.0);
        if let Some(min) = eigen.eigenvalues.iter().copied().reduce(Real::min) {
            if min < -PSD_TOLERANCE * scale {
                return Err(DmpError::invalid_parameter(format!(
                    "covariance is not positive semi-definite (eigenvalue {min})"
                )));
            }
        }
        let roots = eigen.eigenvalues.map(|v| v.max(0.0).sqrt());
        Ok(eigen.eigenvectors * DMatrix::from_diagonal(&roots))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn samples_have_requested_shape() {
        let d = Distribution::isotropic(DVector::from_vec(vec![1.0, 2.0, 3.0]), 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let samples = d.generate_samples(7, &mut rng).unwrap();
        assert_eq!(samples.shape(), (7, 3));
        assert_eq!(d.generate_samples(0, &mut rng).unwrap().shape(), (0, 3));
    }

    #[test]
    fn singular_covariance_samples_the_mean() {
        let mean = DVector::from_vec(vec![0.5, -0.5]);
        let d = Distribution::new(mean.clone(), DMatrix::zeros(2, 2)).unwrap();
        let samples = d.generate_samples(5, &mut StdRng::seed_from_u64(1)).unwrap();
        for row in samples.row_iter() {
            assert!((row.transpose() - &mean).amax() < 1e-15);
        }
        assert_eq!(d.max_eigen_value(), 0.0);
    }

    #[test]
    fn rank_deficient_covariance_stays_on_its_line() {
        // Perfectly correlated dimensions
        let covar = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let d = Distribution::new(DVector::zeros(2), covar).unwrap();
        assert!((d.max_eigen_value() - 2.0).abs() < 1e-12);
        let samples = d.generate_samples(20, &mut StdRng::seed_from_u64(9)).unwrap();
        for row in samples.row_iter() {
            assert!((row[0] - row[1]).abs() < 1e-6);
        }
    }

    #[test]
    fn rejects_invalid_covariances() {
        let mean = DVector::zeros(2);
        let cases = [
            DMatrix::zeros(3, 3),
            DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0]),
            DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]),
            DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, Real::NAN]),
        ];
        for covar in cases {
            assert!(matches!(
                Distribution::new(mean.clone(), covar),
                Err(DmpError::InvalidParameter { .. })
            ));
        }
        assert!(Distribution::isotropic(DVector::zeros(0), 1.0).is_err());
    }

    #[test]
    fn same_seed_same_samples() {
        let d = Distribution::isotropic(DVector::zeros(4), 2.0).unwrap();
        let a = d.generate_samples(10, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = d.generate_samples(10, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }
}
