//! Fixed-step time integrators.

use crate::system::DynamicalSystem;
use dmp_core::{DmpResult, Real, ensure_positive, ensure_time_sequence};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Trait for time integrators.
pub trait Integrator {
    /// Advance state by one time step using the system's differential equation.
    fn step<S: DynamicalSystem + ?Sized>(
        &self,
        system: &S,
        x: &DVector<Real>,
        dt: Real,
    ) -> DmpResult<DVector<Real>>;
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Debug)]
pub struct RK4;

impl Integrator for RK4 {
    fn step<S: DynamicalSystem + ?Sized>(
        &self,
        system: &S,
        x: &DVector<Real>,
        dt: Real,
    ) -> DmpResult<DVector<Real>> {
        let k1 = system.differential_equation(x)?;
        let k2 = system.differential_equation(&(x + &k1 * (0.5 * dt)))?;
        let k3 = system.differential_equation(&(x + &k2 * (0.5 * dt)))?;
        let k4 = system.differential_equation(&(x + &k3 * dt))?;

        // x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
        let k_sum = k1 + k2 * 2.0 + k3 * 2.0 + k4;
        Ok(x + k_sum * (dt / 6.0))
    }
}

/// Forward Euler (explicit, 1st order).
/// Calls the differential equation once per step instead of 4 times (RK4).
#[derive(Clone, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<S: DynamicalSystem + ?Sized>(
        &self,
        system: &S,
        x: &DVector<Real>,
        dt: Real,
    ) -> DmpResult<DVector<Real>> {
        let xd = system.differential_equation(x)?;
        Ok(x + xd * dt)
    }
}

/// Integrator selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegratorType {
    /// 4th-order Runge-Kutta, 4 evaluations per step.
    #[default]
    RK4,
    /// Forward Euler (1st-order, 1 evaluation per step).
    ForwardEuler,
}

impl Integrator for IntegratorType {
    fn step<S: DynamicalSystem + ?Sized>(
        &self,
        system: &S,
        x: &DVector<Real>,
        dt: Real,
    ) -> DmpResult<DVector<Real>> {
        match self {
            IntegratorType::RK4 => RK4.step(system, x, dt),
            IntegratorType::ForwardEuler => ForwardEuler.step(system, x, dt),
        }
    }
}

/// Options for numerical integration over a time grid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntegrationOptions {
    /// Integrator type (default: RK4)
    pub integrator: IntegratorType,
    /// Largest internal step (seconds); intervals of the grid are subdivided to respect it
    pub max_dt: Real,
}

impl Default for IntegrationOptions {
    fn default() -> Self {
        Self {
            integrator: IntegratorType::default(),
            max_dt: 1e-3,
        }
    }
}

/// Numerically integrate `system` from `x_init` at t = 0 and sample it at `ts`.
///
/// Produces the same layout as `DynamicalSystem::analytical_solution`, which
/// makes it the fallback for systems without a closed form and the reference
/// when checking one.
pub fn integrate_numerically<S: DynamicalSystem + ?Sized>(
    system: &S,
    ts: &DVector<Real>,
    opts: &IntegrationOptions,
) -> DmpResult<(DMatrix<Real>, DMatrix<Real>)> {
    ensure_time_sequence(ts)?;
    ensure_positive(opts.max_dt, "max_dt")?;

    let n = ts.len();
    let dim = system.dim_x();
    let mut xs = DMatrix::zeros(n, dim);
    let mut xds = DMatrix::zeros(n, dim);

    let mut t = 0.0;
    let mut x = system.x_init().clone();
    for (i, &t_target) in ts.iter().enumerate() {
        let span = t_target - t;
        if span > 0.0 {
            let n_sub = (span / opts.max_dt).ceil().max(1.0) as usize;
            let dt = span / n_sub as Real;
            for _ in 0..n_sub {
                x = opts.integrator.step(system, &x, dt)?;
            }
            t = t_target;
        }
        let xd = system.differential_equation(&x)?;
        xs.set_row(i, &x.transpose());
        xds.set_row(i, &xd.transpose());
    }
    Ok((xs, xds))
}
