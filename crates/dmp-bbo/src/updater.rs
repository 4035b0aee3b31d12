//! Distribution updaters.

use crate::distribution::Distribution;
use crate::error::{BboError, BboResult};
use crate::weighting::WeightingMethod;
use dmp_core::Real;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Turns samples (one per row) and their costs into a new distribution.
///
/// Returns the new distribution and the weights that were given to the
/// samples. The weights are informative only.
pub trait Updater {
    fn update_distribution(
        &self,
        distribution: &Distribution,
        samples: &DMatrix<Real>,
        costs: &DVector<Real>,
    ) -> BboResult<(Distribution, DVector<Real>)>;
}

fn check_batch(distribution: &Distribution, samples: &DMatrix<Real>, costs: &DVector<Real>) -> BboResult<()> {
    if samples.ncols() != distribution.dim() {
        return Err(BboError::updater(format!(
            "samples have {} columns, distribution has dimension {}",
            samples.ncols(),
            distribution.dim()
        )));
    }
    if samples.nrows() != costs.len() {
        return Err(BboError::updater(format!(
            "{} samples but {} costs",
            samples.nrows(),
            costs.len()
        )));
    }
    Ok(())
}

/// Weighted average of the samples.
fn weighted_mean(samples: &DMatrix<Real>, weights: &DVector<Real>) -> DVector<Real> {
    samples.transpose() * weights
}

/// Reward-weighted averaging of the mean; the covariance is kept.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdaterMean {
    pub weighting: WeightingMethod,
}

impl UpdaterMean {
    pub fn new(weighting: WeightingMethod) -> Self {
        Self { weighting }
    }
}

impl Updater for UpdaterMean {
    fn update_distribution(
        &self,
        distribution: &Distribution,
        samples: &DMatrix<Real>,
        costs: &DVector<Real>,
    ) -> BboResult<(Distribution, DVector<Real>)> {
        check_batch(distribution, samples, costs)?;
        let weights = self.weighting.costs_to_weights(costs)?;
        let mean = weighted_mean(samples, &weights);
        Ok((Distribution::new(mean, distribution.covar().clone())?, weights))
    }
}

/// Mean update plus a covariance that shrinks by `decay^2` every update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdaterCovarDecay {
    pub weighting: WeightingMethod,
    decay: Real,
}

impl UpdaterCovarDecay {
    /// `decay` must lie in (0, 1].
    pub fn new(decay: Real, weighting: WeightingMethod) -> BboResult<Self> {
        if !(decay > 0.0 && decay <= 1.0) {
            return Err(BboError::updater(format!("decay must lie in (0, 1], got {decay}")));
        }
        Ok(Self { weighting, decay })
    }

    pub fn decay(&self) -> Real {
        self.decay
    }
}

impl Updater for UpdaterCovarDecay {
    fn update_distribution(
        &self,
        distribution: &Distribution,
        samples: &DMatrix<Real>,
        costs: &DVector<Real>,
    ) -> BboResult<(Distribution, DVector<Real>)> {
        check_batch(distribution, samples, costs)?;
        let weights = self.weighting.costs_to_weights(costs)?;
        let mean = weighted_mean(samples, &weights);
        let covar = distribution.covar() * (self.decay * self.decay);
        Ok((Distribution::new(mean, covar)?, weights))
    }
}

/// Mean update plus covariance matrix adaptation.
///
/// The new covariance is the weighted covariance of the samples around the
/// old mean, blended with the old covariance by `learning_rate`. Eigenvalues
/// are then clamped to `[min_relative_eigenvalue * largest, max_eigenvalue]`
/// and never below zero, so the result is positive semi-definite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdaterCovarAdaptation {
    pub weighting: WeightingMethod,
    pub learning_rate: Real,
    /// Keep only the diagonal of the adapted covariance.
    pub diag_only: bool,
    /// Smallest eigenvalue allowed, relative to the largest one.
    pub min_relative_eigenvalue: Option<Real>,
    /// Largest eigenvalue allowed.
    pub max_eigenvalue: Option<Real>,
}

impl Default for UpdaterCovarAdaptation {
    fn default() -> Self {
        Self {
            weighting: WeightingMethod::CmaEs { n_elite: None },
            learning_rate: 1.0,
            diag_only: false,
            min_relative_eigenvalue: Some(1e-3),
            max_eigenvalue: None,
        }
    }
}

impl UpdaterCovarAdaptation {
    fn validate(&self) -> BboResult<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(BboError::updater(format!(
                "learning_rate must lie in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if let Some(rel) = self.min_relative_eigenvalue {
            if !(0.0..=1.0).contains(&rel) {
                return Err(BboError::updater(format!(
                    "min_relative_eigenvalue must lie in [0, 1], got {rel}"
                )));
            }
        }
        if let Some(max) = self.max_eigenvalue {
            if !(max > 0.0) {
                return Err(BboError::updater(format!("max_eigenvalue must be positive, got {max}")));
            }
        }
        Ok(())
    }

    fn clamp_eigenvalues(&self, covar: DMatrix<Real>) -> DMatrix<Real> {
        let sym = (&covar + covar.transpose()) * 0.5;
        let eigen = sym.symmetric_eigen();
        let largest = eigen.eigenvalues.max().max(0.0);
        let floor = self.min_relative_eigenvalue.map_or(0.0, |rel| rel * largest);
        let ceiling = self.max_eigenvalue.unwrap_or(Real::INFINITY);

        // Rank-deficient updates give eigenvalues of order -1e-17; only report real violations
        let n_negative = eigen.eigenvalues.iter().filter(|&&v| v < -1e-12 * largest).count();
        if n_negative > 0 {
            warn!(n_negative, "adapted covariance is not positive semi-definite; clamping eigenvalues");
        }
        let clamped = eigen.eigenvalues.map(|v| v.max(floor).min(ceiling));

        let v = &eigen.eigenvectors;
        let rebuilt = v * DMatrix::from_diagonal(&clamped) * v.transpose();
        (&rebuilt + rebuilt.transpose()) * 0.5
    }
}

impl Updater for UpdaterCovarAdaptation {
    fn update_distribution(
        &self,
        distribution: &Distribution,
        samples: &DMatrix<Real>,
        costs: &DVector<Real>,
    ) -> BboResult<(Distribution, DVector<Real>)> {
        self.validate()?;
        check_batch(distribution, samples, costs)?;
        let weights = self.weighting.costs_to_weights(costs)?;
        let mean = weighted_mean(samples, &weights);

        let mut eps = samples.clone();
        for mut row in eps.row_iter_mut() {
            row -= distribution.mean().transpose();
        }
        let mut adapted = eps.transpose() * DMatrix::from_diagonal(&weights) * &eps;
        if self.diag_only {
            adapted = DMatrix::from_diagonal(&adapted.diagonal());
        }
        let blended = distribution.covar() * (1.0 - self.learning_rate) + adapted * self.learning_rate;
        let covar = self.clamp_eigenvalues(blended);
        Ok((Distribution::new(mean, covar)?, weights))
    }
}
