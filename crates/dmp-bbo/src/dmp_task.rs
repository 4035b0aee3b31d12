//! Optimizing DMP parameters: a task solver that rolls out a DMP and a
//! viapoint task that scores its trajectory.

use crate::error::{BboError, BboResult};
use crate::task::{Task, TaskSolver};
use dmp::Dmp;
use dmp_core::{DmpError, Real, Trajectory, ensure_finite};
use dmp_dynamics::DynamicalSystem;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Rolls out a DMP with the sampled approximator parameters.
///
/// The cost variables are the trajectory in the `[ts | ys | yds | ydds]`
/// layout of [`Trajectory::as_matrix`].
#[derive(Clone, Debug)]
pub struct DmpTaskSolver {
    dmp: Dmp,
    ts: DVector<Real>,
}

impl DmpTaskSolver {
    /// # Errors
    ///
    /// `InvalidParameter` if the DMP is untrained or `ts` is not a strictly
    /// increasing, non-negative sequence.
    pub fn new(dmp: Dmp, ts: DVector<Real>) -> BboResult<Self> {
        if !dmp.is_trained() {
            return Err(DmpError::invalid_parameter("DMP must be trained before it can be optimized").into());
        }
        if ts.is_empty() || ts[0] < 0.0 || ts.iter().zip(ts.iter().skip(1)).any(|(a, b)| b <= a) {
            return Err(DmpError::invalid_parameter(
                "rollout times must be non-negative and strictly increasing",
            )
            .into());
        }
        Ok(Self { dmp, ts })
    }

    pub fn dmp(&self) -> &Dmp {
        &self.dmp
    }

    pub fn ts(&self) -> &DVector<Real> {
        &self.ts
    }

    /// Trajectory of the DMP with the given parameters.
    pub fn rollout_trajectory(&self, sample: &DVector<Real>) -> BboResult<Trajectory> {
        let mut dmp = self.dmp.clone();
        dmp.set_parameter_vector(sample)?;
        let (xs, xds) = dmp.analytical_solution(&self.ts)?;
        Ok(dmp.states_as_trajectory(&self.ts, &xs, &xds)?)
    }
}

impl TaskSolver for DmpTaskSolver {
    fn perform_rollout(&self, sample: &DVector<Real>) -> BboResult<DMatrix<Real>> {
        Ok(self.rollout_trajectory(sample)?.as_matrix())
    }
}

/// Pass through a viapoint with little acceleration.
///
/// Costs are `[total, viapoint distance, acceleration]`. With a
/// `viapoint_time` the distance is measured at the sample closest to that
/// time, otherwise it is the smallest distance along the whole trajectory.
/// The acceleration cost is `acceleration_weight` times the mean squared
/// acceleration norm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViapointTask {
    viapoint: DVector<Real>,
    viapoint_time: Option<Real>,
    acceleration_weight: Real,
}

impl ViapointTask {
    pub fn new(
        viapoint: DVector<Real>,
        viapoint_time: Option<Real>,
        acceleration_weight: Real,
    ) -> BboResult<Self> {
        if viapoint.is_empty() {
            return Err(DmpError::invalid_parameter("viapoint must not be empty").into());
        }
        for &v in viapoint.iter() {
            ensure_finite(v, "viapoint")?;
        }
        if let Some(t) = viapoint_time {
            ensure_finite(t, "viapoint_time")?;
        }
        if !(acceleration_weight >= 0.0) {
            return Err(DmpError::invalid_parameter(format!(
                "acceleration_weight must be non-negative, got {acceleration_weight}"
            ))
            .into());
        }
        Ok(Self {
            viapoint,
            viapoint_time,
            acceleration_weight,
        })
    }

    pub fn viapoint(&self) -> &DVector<Real> {
        &self.viapoint
    }

    fn distance_at(&self, traj: &Trajectory, i: usize) -> Real {
        (traj.ys().row(i).transpose() - &self.viapoint).norm()
    }
}

impl Task for ViapointTask {
    fn evaluate_rollout(&self, cost_vars: &DMatrix<Real>) -> BboResult<DVector<Real>> {
        let traj = Trajectory::from_matrix(cost_vars)?;
        if traj.dim() != self.viapoint.len() {
            return Err(BboError::task(format!(
                "trajectory has {} dimensions, viapoint has {}",
                traj.dim(),
                self.viapoint.len()
            )));
        }

        let distance = match self.viapoint_time {
            Some(t) => {
                let closest = traj
                    .ts()
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| (*a - t).abs().total_cmp(&(*b - t).abs()))
                    .map_or(0, |(i, _)| i);
                self.distance_at(&traj, closest)
            }
            None => (0..traj.len())
                .map(|i| self.distance_at(&traj, i))
                .fold(Real::INFINITY, Real::min),
        };

        let ydds = traj.ydds();
        let mean_sq_acc = ydds.row_iter().map(|row| row.norm_squared()).sum::<Real>() / traj.len() as Real;
        let acceleration = self.acceleration_weight * mean_sq_acc;

        Ok(DVector::from_vec(vec![distance + acceleration, distance, acceleration]))
    }

    fn cost_component_names(&self) -> Vec<String> {
        ["total", "viapoint", "acceleration"].map(String::from).to_vec()
    }
}
