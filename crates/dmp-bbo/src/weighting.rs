//! Turning rollout costs into sample weights.

use crate::error::{BboError, BboResult};
use dmp_core::Real;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// How costs become normalized, non-negative weights (lower cost, higher weight).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum WeightingMethod {
    /// `exp(-eliteness * normalized cost)`, as in PI^BB.
    PiBb { eliteness: Real },
    /// Log-rank weights over the best `n_elite` samples (half the samples by default).
    CmaEs { n_elite: Option<usize> },
    /// Uniform weights over the best `n_elite` samples.
    Cem { n_elite: usize },
}

impl Default for WeightingMethod {
    fn default() -> Self {
        WeightingMethod::PiBb { eliteness: 10.0 }
    }
}

impl WeightingMethod {
    /// Weights summing to one, in the order of `costs`.
    ///
    /// Equal costs are ranked by sample order.
    pub fn costs_to_weights(&self, costs: &DVector<Real>) -> BboResult<DVector<Real>> {
        let n = costs.len();
        if n == 0 {
            return Err(BboError::updater("no costs to weight"));
        }
        if costs.iter().any(|c| !c.is_finite()) {
            return Err(BboError::updater("costs must be finite"));
        }

        let weights = match *self {
            WeightingMethod::PiBb { eliteness } => {
                if !(eliteness > 0.0) {
                    return Err(BboError::updater(format!(
                        "eliteness must be positive, got {eliteness}"
                    )));
                }
                let (lo, hi) = (costs.min(), costs.max());
                if hi - lo <= 0.0 {
                    DVector::from_element(n, 1.0)
                } else {
                    costs.map(|c| (-eliteness * (c - lo) / (hi - lo)).exp())
                }
            }
            WeightingMethod::CmaEs { n_elite } => {
                let mu = n_elite.unwrap_or(n / 2).clamp(1, n);
                let mut w = DVector::zeros(n);
                for (rank, i) in ranked(costs).into_iter().take(mu).enumerate() {
                    w[i] = (mu as Real + 0.5).ln() - ((rank + 1) as Real).ln();
                }
                w
            }
            WeightingMethod::Cem { n_elite } => {
                let mu = n_elite.clamp(1, n);
                let mut w = DVector::zeros(n);
                for i in ranked(costs).into_iter().take(mu) {
                    w[i] = 1.0;
                }
                w
            }
        };
        let total = weights.sum();
        Ok(weights / total)
    }
}

/// Sample indices from lowest to highest cost; ties keep sample order.
fn ranked(costs: &DVector<Real>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..costs.len()).collect();
    order.sort_by(|&a, &b| costs[a].total_cmp(&costs[b]));
    order
}
