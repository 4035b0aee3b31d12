//! DynamicalSystem trait for pluggable first-order systems.

use crate::integrator::{Integrator, IntegratorType};
use dmp_core::{DmpResult, Real, ensure_len, ensure_positive};
use nalgebra::{DMatrix, DVector};

/// Trait for first-order dynamical systems `xd = f(x)` with time constant `tau`.
///
/// A DynamicalSystem must implement:
/// - dimensions of the full state (`dim_x`) and of its output part (`dim_y`)
/// - the differential equation
/// - an analytical solution for a sequence of times, starting from `x_init` at t = 0
///
/// `integrate_step` defaults to one RK4 step. Systems with a closed form
/// override it with the exact advance, so that stepping and
/// `analytical_solution` agree at matching cumulative times.
pub trait DynamicalSystem {
    /// Length of the state vector.
    fn dim_x(&self) -> usize;

    /// Length of the output part of the state (`dim_x >= dim_y >= 1`).
    fn dim_y(&self) -> usize {
        self.dim_x()
    }

    fn tau(&self) -> Real;

    /// Change the time constant.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `tau` is not strictly positive.
    fn set_tau(&mut self, tau: Real) -> DmpResult<()>;

    fn x_init(&self) -> &DVector<Real>;

    /// Rate of change of the state. Pure; fails with `InvalidState` on a
    /// state of the wrong length.
    fn differential_equation(&self, x: &DVector<Real>) -> DmpResult<DVector<Real>>;

    /// States and their derivatives at each time in `ts` (one row per time).
    fn analytical_solution(&self, ts: &DVector<Real>) -> DmpResult<(DMatrix<Real>, DMatrix<Real>)>;

    /// Initial state and its rate of change.
    fn integrate_start(&self) -> DmpResult<(DVector<Real>, DVector<Real>)> {
        let x = self.x_init().clone();
        let xd = self.differential_equation(&x)?;
        Ok((x, xd))
    }

    /// Advance `x` by `dt` and return the new state with its rate of change.
    fn integrate_step(&self, dt: Real, x: &DVector<Real>) -> DmpResult<(DVector<Real>, DVector<Real>)> {
        self.integrate_step_with(IntegratorType::default(), dt, x)
    }

    /// Advance `x` by `dt` with an explicit numerical integrator, ignoring any closed form.
    fn integrate_step_with(
        &self,
        integrator: IntegratorType,
        dt: Real,
        x: &DVector<Real>,
    ) -> DmpResult<(DVector<Real>, DVector<Real>)> {
        ensure_positive(dt, "dt")?;
        ensure_len(x, self.dim_x(), "state")?;
        let x_new = integrator.step(self, x, dt)?;
        let xd_new = self.differential_equation(&x_new)?;
        Ok((x_new, xd_new))
    }
}
