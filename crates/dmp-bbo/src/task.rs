//! Collaborator contracts of the optimization loop.

use crate::error::{BboError, BboResult};
use dmp_core::Real;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Scores the outcome of a rollout.
pub trait Task {
    /// Cost vector for the variables a rollout produced. The first entry is
    /// the total cost that is optimized; further entries are components for
    /// inspection.
    fn evaluate_rollout(&self, cost_vars: &DMatrix<Real>) -> BboResult<DVector<Real>>;

    /// Names of the cost components, first one being the total.
    fn cost_component_names(&self) -> Vec<String> {
        vec!["total".to_string()]
    }
}

/// Executes a parameterized policy and records whatever the [`Task`] needs.
pub trait TaskSolver {
    fn perform_rollout(&self, sample: &DVector<Real>) -> BboResult<DMatrix<Real>>;
}

/// One executed sample: its parameters, what the solver recorded and the
/// resulting costs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rollout {
    sample: DVector<Real>,
    cost_vars: DMatrix<Real>,
    costs: DVector<Real>,
}

impl Rollout {
    /// # Errors
    ///
    /// `Task` if `costs` is empty.
    pub fn new(sample: DVector<Real>, cost_vars: DMatrix<Real>, costs: DVector<Real>) -> BboResult<Self> {
        if costs.is_empty() {
            return Err(BboError::task("task returned an empty cost vector"));
        }
        Ok(Self {
            sample,
            cost_vars,
            costs,
        })
    }

    pub fn sample(&self) -> &DVector<Real> {
        &self.sample
    }

    pub fn cost_vars(&self) -> &DMatrix<Real> {
        &self.cost_vars
    }

    pub fn costs(&self) -> &DVector<Real> {
        &self.costs
    }

    /// First cost component.
    pub fn total_cost(&self) -> Real {
        self.costs[0]
    }
}
