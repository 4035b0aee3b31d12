//! Exponential decay towards an attractor.

use crate::system::DynamicalSystem;
use dmp_core::{DmpError, DmpResult, Real, ensure_len, ensure_positive, ensure_time_sequence};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Exponential decay: `xd = alpha * (x_attr - x) / tau`.
///
/// Serves as phase and gating system (decaying from 1 to 0) and as goal
/// system (moving the goal smoothly from `y_init` to `y_attr`).
///
/// # Example
///
/// ```
/// use dmp_dynamics::{DynamicalSystem, ExponentialSystem};
/// use nalgebra::DVector;
///
/// let sys = ExponentialSystem::new(
///     1.0,
///     DVector::from_element(1, 1.0),
///     DVector::from_element(1, 0.0),
///     4.0,
/// )
/// .unwrap();
///
/// let (x0, _) = sys.integrate_start().unwrap();
/// let (x1, _) = sys.integrate_step(0.5, &x0).unwrap();
/// assert!((x1[0] - (-2.0f64).exp()).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExponentialSystem {
    tau: Real,
    x_init: DVector<Real>,
    x_attr: DVector<Real>,
    alpha: Real,
}

impl ExponentialSystem {
    /// Create a new exponential system.
    ///
    /// # Arguments
    ///
    /// * `tau` - Time constant in seconds (must be positive)
    /// * `x_init` - Initial state
    /// * `x_attr` - Attractor state (same length as `x_init`)
    /// * `alpha` - Decay constant (must be positive)
    pub fn new(
        tau: Real,
        x_init: DVector<Real>,
        x_attr: DVector<Real>,
        alpha: Real,
    ) -> DmpResult<Self> {
        ensure_positive(tau, "tau")?;
        ensure_positive(alpha, "alpha")?;
        if x_init.is_empty() {
            return Err(DmpError::invalid_state("x_init must not be empty"));
        }
        ensure_len(&x_attr, x_init.len(), "x_attr")?;
        Ok(Self {
            tau,
            x_init,
            x_attr,
            alpha,
        })
    }

    pub fn alpha(&self) -> Real {
        self.alpha
    }

    pub fn x_attr(&self) -> &DVector<Real> {
        &self.x_attr
    }

    /// Replace the attractor state; its length must match the state dimension.
    pub fn set_x_attr(&mut self, x_attr: DVector<Real>) -> DmpResult<()> {
        ensure_len(&x_attr, self.dim_x(), "x_attr")?;
        self.x_attr = x_attr;
        Ok(())
    }

    /// Replace the initial state; its length must match the state dimension.
    pub fn set_x_init(&mut self, x_init: DVector<Real>) -> DmpResult<()> {
        ensure_len(&x_init, self.dim_x(), "x_init")?;
        self.x_init = x_init;
        Ok(())
    }
}

impl DynamicalSystem for ExponentialSystem {
    fn dim_x(&self) -> usize {
        self.x_init.len()
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
        ensure_len(x, self.dim_x(), "state")?;
        Ok((&self.x_attr - x) * (self.alpha / self.tau))
    }

    fn analytical_solution(&self, ts: &DVector<Real>) -> DmpResult<(DMatrix<Real>, DMatrix<Real>)> {
        ensure_time_sequence(ts)?;
        let rate = self.alpha / self.tau;

        let exp_term = ts.map(|t| (-rate * t).exp());
        let val_range = &self.x_init - &self.x_attr;
        let ones = DVector::<Real>::from_element(ts.len(), 1.0);

        // Outer products: one row per time, one column per state dimension
        let xs = &exp_term * val_range.transpose() + ones * self.x_attr.transpose();
        let xds = (&exp_term * val_range.transpose()) * -rate;
        Ok((xs, xds))
    }

    fn integrate_step(&self, dt: Real, x: &DVector<Real>) -> DmpResult<(DVector<Real>, DVector<Real>)> {
        ensure_positive(dt, "dt")?;
        ensure_len(x, self.dim_x(), "state")?;
        let decay = (-self.alpha * dt / self.tau).exp();
        let x_new = &self.x_attr + (x - &self.x_attr) * decay;
        let xd_new = self.differential_equation(&x_new)?;
        Ok((x_new, xd_new))
    }
}
