//! Linear phase system.

use crate::system::DynamicalSystem;
use dmp_core::{DmpResult, Real, ensure_len, ensure_positive, ensure_time_sequence};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// One-dimensional phase that moves linearly from 0 to 1 in `tau` seconds
/// (or from 1 to 0 when counting down) and then stays put.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSystem {
    tau: Real,
    count_down: bool,
    x_init: DVector<Real>,
}

impl TimeSystem {
    pub fn new(tau: Real, count_down: bool) -> DmpResult<Self> {
        ensure_positive(tau, "tau")?;
        let start = if count_down { 1.0 } else { 0.0 };
        Ok(Self {
            tau,
            count_down,
            x_init: DVector::from_element(1, start),
        })
    }

    pub fn count_down(&self) -> bool {
        self.count_down
    }

    fn rate(&self, x: Real) -> Real {
        if self.count_down {
            if x > 0.0 { -1.0 / self.tau } else { 0.0 }
        } else if x < 1.0 {
            1.0 / self.tau
        } else {
            0.0
        }
    }

    fn position(&self, t: Real) -> Real {
        let progress = (t / self.tau).min(1.0);
        if self.count_down { 1.0 - progress } else { progress }
    }
}

impl DynamicalSystem for TimeSystem {
    fn dim_x(&self) -> usize {
        1
    }

    fn tau(&self) -> Real {
        self.tau
    }

    fn set_tau(&mut self, tau: Real) -> DmpResult<()> {
        self.tau = ensure_positive(tau, "tau")?;
        Ok(())
    }

    fn x_init(&self) -> &DVector<Real> {
        &self.x_init
    }

    fn differential_equation(&self, x: &DVector<Real>) -> DmpResult<DVector<Real>> {
        ensure_len(x, 1, "state")?;
        Ok(DVector::from_element(1, self.rate(x[0])))
    }

    fn analytical_solution(&self, ts: &DVector<Real>) -> DmpResult<(DMatrix<Real>, DMatrix<Real>)> {
        ensure_time_sequence(ts)?;
        let xs = DMatrix::from_fn(ts.len(), 1, |i, _| self.position(ts[i]));
        let xds = DMatrix::from_fn(ts.len(), 1, |i, _| self.rate(xs[(i, 0)]));
        Ok((xs, xds))
    }

    fn integrate_step(&self, dt: Real, x: &DVector<Real>) -> DmpResult<(DVector<Real>, DVector<Real>)> {
        ensure_positive(dt, "dt")?;
        ensure_len(x, 1, "state")?;
        let delta = dt / self.tau;
        let next = if self.count_down {
            (x[0] - delta).max(0.0)
        } else {
            (x[0] + delta).min(1.0)
        };
        let x_new = DVector::from_element(1, next);
        let xd_new = self.differential_equation(&x_new)?;
        Ok((x_new, xd_new))
    }
}
