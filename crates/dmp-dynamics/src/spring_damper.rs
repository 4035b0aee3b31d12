//! Critically damped spring-damper system.

use crate::system::DynamicalSystem;
use dmp_core::{DmpError, DmpResult, Real, ensure_len, ensure_positive, ensure_time_sequence};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Second-order attractor dynamics written as a first-order system.
///
/// State is `[y, z]` with `z = tau * yd`, so `dim_x = 2 * dim_y`:
///
/// ```text
/// yd = z / tau
/// zd = (-k (y - y_attr) - d z) / tau,     k = d^2 / 4 (critical damping, unit mass)
/// ```
///
/// The error `e = y - y_attr` then evolves as `e(t) = (e0 + (ed0 + w e0) t) exp(-w t)`
/// with `w = d / (2 tau)`, which is what both `analytical_solution` and
/// `integrate_step` evaluate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpringDamperSystem {
    tau: Real,
    x_init: DVector<Real>,
    y_attr: DVector<Real>,
    damping_coefficient: Real,
}

impl SpringDamperSystem {
    /// Create a spring-damper starting at rest in `y_init`.
    pub fn new(
        tau: Real,
        y_init: DVector<Real>,
        y_attr: DVector<Real>,
        damping_coefficient: Real,
    ) -> DmpResult<Self> {
        ensure_positive(tau, "tau")?;
        ensure_positive(damping_coefficient, "damping_coefficient")?;
        let dim_y = y_init.len();
        if dim_y == 0 {
            return Err(DmpError::invalid_state("y_init must not be empty"));
        }
        ensure_len(&y_attr, dim_y, "y_attr")?;
        let mut x_init = DVector::zeros(2 * dim_y);
        x_init.rows_mut(0, dim_y).copy_from(&y_init);
        Ok(Self {
            tau,
            x_init,
            y_attr,
            damping_coefficient,
        })
    }

    pub fn damping_coefficient(&self) -> Real {
        self.damping_coefficient
    }

    pub fn spring_constant(&self) -> Real {
        self.damping_coefficient * self.damping_coefficient / 4.0
    }

    pub fn y_attr(&self) -> &DVector<Real> {
        &self.y_attr
    }

    pub fn set_y_attr(&mut self, y_attr: DVector<Real>) -> DmpResult<()> {
        ensure_len(&y_attr, self.dim_y(), "y_attr")?;
        self.y_attr = y_attr;
        Ok(())
    }

    /// Replace the full initial state `[y, z]`.
    pub fn set_x_init(&mut self, x_init: DVector<Real>) -> DmpResult<()> {
        ensure_len(&x_init, self.dim_x(), "x_init")?;
        self.x_init = x_init;
        Ok(())
    }

    /// Replace the initial position, keeping the initial `z`.
    pub fn set_y_init(&mut self, y_init: &DVector<Real>) -> DmpResult<()> {
        let dim_y = self.dim_y();
        ensure_len(y_init, dim_y, "y_init")?;
        self.x_init.rows_mut(0, dim_y).copy_from(y_init);
        Ok(())
    }

    /// Exact advance by `dt` while the equilibrium moves linearly from
    /// `eq_start` to `eq_end`.
    ///
    /// The equilibrium is where the spring is at rest: the attractor itself,
    /// shifted by `f / k` when a constant force `f` acts on the mass. A DMP
    /// passes `goal + forcing / k` at both ends of the step.
    pub fn step_towards(
        &self,
        x: &DVector<Real>,
        eq_start: &DVector<Real>,
        eq_end: &DVector<Real>,
        dt: Real,
    ) -> DmpResult<DVector<Real>> {
        let dim_y = self.dim_y();
        ensure_len(x, self.dim_x(), "state")?;
        ensure_len(eq_start, dim_y, "eq_start")?;
        ensure_len(eq_end, dim_y, "eq_end")?;
        if dt < 0.0 {
            return Err(DmpError::invalid_parameter("dt must be non-negative"));
        }

        let w = self.damping_coefficient / (2.0 * self.tau);
        let decay = (-w * dt).exp();
        let mut x_new = DVector::zeros(self.dim_x());
        for d in 0..dim_y {
            let slope = if dt > 0.0 {
                (eq_end[d] - eq_start[d]) / dt
            } else {
                0.0
            };
            // Particular solution for a linear equilibrium a + b t is a + b t - 2b/w
            let lag = 2.0 * slope / w;
            let e0 = x[d] - (eq_start[d] - lag);
            let ed0 = x[dim_y + d] / self.tau - slope;
            let b = ed0 + w * e0;

            let e = (e0 + b * dt) * decay;
            let ed = (ed0 - w * b * dt) * decay;
            x_new[d] = eq_start[d] + slope * dt - lag + e;
            x_new[dim_y + d] = self.tau * (slope + ed);
        }
        Ok(x_new)
    }
}

impl DynamicalSystem for SpringDamperSystem {
    fn dim_x(&self) -> usize {
        self.x_init.len()
    }

    fn dim_y(&self) -> usize {
        self.x_init.len() / 2
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
        let dim_y = self.dim_y();
        let k = self.spring_constant();
        let y = x.rows(0, dim_y);
        let z = x.rows(dim_y, dim_y);

        let mut xd = DVector::zeros(self.dim_x());
        xd.rows_mut(0, dim_y).copy_from(&(z / self.tau));
        let zd = ((&self.y_attr - y) * k - z * self.damping_coefficient) / self.tau;
        xd.rows_mut(dim_y, dim_y).copy_from(&zd);
        Ok(xd)
    }

    fn analytical_solution(&self, ts: &DVector<Real>) -> DmpResult<(DMatrix<Real>, DMatrix<Real>)> {
        ensure_time_sequence(ts)?;
        let n = ts.len();
        let mut xs = DMatrix::zeros(n, self.dim_x());
        let mut xds = DMatrix::zeros(n, self.dim_x());
        for (i, &t) in ts.iter().enumerate() {
            let x = self.step_towards(&self.x_init, &self.y_attr, &self.y_attr, t)?;
            let xd = self.differential_equation(&x)?;
            xs.set_row(i, &x.transpose());
            xds.set_row(i, &xd.transpose());
        }
        Ok((xs, xds))
    }

    fn integrate_step(&self, dt: Real, x: &DVector<Real>) -> DmpResult<(DVector<Real>, DVector<Real>)> {
        ensure_positive(dt, "dt")?;
        let x_new = self.step_towards(x, &self.y_attr, &self.y_attr, dt)?;
        let xd_new = self.differential_equation(&x_new)?;
        Ok((x_new, xd_new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IntegrationOptions, integrate_numerically};
    use dmp_core::{linspace, max_abs_diff};

    fn spring() -> SpringDamperSystem {
        SpringDamperSystem::new(
            0.5,
            DVector::from_vec(vec![0.0, 0.7]),
            DVector::from_vec(vec![0.4, 0.5]),
            20.0,
        )
        .unwrap()
    }

    #[test]
    fn closed_form_matches_rk4() {
        let sys = spring();
        let ts = linspace(0.0, 1.0, 21);
        let (xs_ana, xds_ana) = sys.analytical_solution(&ts).unwrap();
        let (xs_num, xds_num) = integrate_numerically(&sys, &ts, &IntegrationOptions::default()).unwrap();
        assert!(max_abs_diff(&xs_ana, &xs_num) < 1e-8);
        assert!(max_abs_diff(&xds_ana, &xds_num) < 1e-6);
    }

    #[test]
    fn stepping_matches_analytical_solution() {
        let sys = spring();
        let ts = linspace(0.0, 0.5, 51);
        let (xs_ana, _) = sys.analytical_solution(&ts).unwrap();
        let (mut x, _) = sys.integrate_start().unwrap();
        for i in 1..ts.len() {
            let (x_new, _) = sys.integrate_step(ts[i] - ts[i - 1], &x).unwrap();
            assert!((&x_new - xs_ana.row(i).transpose()).amax() < 1e-12);
            x = x_new;
        }
    }

    #[test]
    fn converges_to_attractor() {
        let sys = spring();
        let (xs, xds) = sys
            .analytical_solution(&DVector::from_element(1, 5.0))
            .unwrap();
        assert!((xs[(0, 0)] - 0.4).abs() < 1e-12);
        assert!((xs[(0, 1)] - 0.5).abs() < 1e-12);
        assert!(xds.amax() < 1e-12);
    }

    #[test]
    fn moving_equilibrium_matches_rk4_with_ramp() {
        // A ramped equilibrium is the same as a spring whose attractor moves linearly
        let sys = SpringDamperSystem::new(1.0, DVector::from_element(1, 0.0), DVector::from_element(1, 0.0), 20.0)
            .unwrap();
        let x0 = DVector::from_vec(vec![0.1, -0.3]);
        let dt = 0.2;
        let exact = sys
            .step_towards(&x0, &DVector::from_element(1, 0.0), &DVector::from_element(1, 1.0), dt)
            .unwrap();

        let n_sub = 2000;
        let h = dt / n_sub as Real;
        let k = sys.spring_constant();
        let d = sys.damping_coefficient();
        let mut x = x0.clone();
        let mut t: Real = 0.0;
        let rhs = |t: Real, x: &DVector<Real>| {
            let eq = t / dt;
            DVector::from_vec(vec![x[1], -k * (x[0] - eq) - d * x[1]])
        };
        for _ in 0..n_sub {
            let k1 = rhs(t, &x);
            let k2 = rhs(t + 0.5 * h, &(&x + &k1 * (0.5 * h)));
            let k3 = rhs(t + 0.5 * h, &(&x + &k2 * (0.5 * h)));
            let k4 = rhs(t + h, &(&x + &k3 * h));
            x += (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0);
            t += h;
        }
        assert!((exact - x).amax() < 1e-9);
    }

    #[test]
    fn zero_step_is_identity() {
        let sys = spring();
        let x = DVector::from_vec(vec![0.1, 0.2, 0.3, -0.4]);
        let same = sys.step_towards(&x, sys.y_attr(), sys.y_attr(), 0.0).unwrap();
        assert!((same - x).amax() < 1e-15);
    }

    #[test]
    fn dimensions() {
        let mut sys = spring();
        assert_eq!(sys.dim_x(), 4);
        assert_eq!(sys.dim_y(), 2);
        assert!((sys.spring_constant() - 100.0).abs() < 1e-12);
        assert!(sys.set_y_attr(DVector::zeros(3)).is_err());
        assert!(matches!(
            sys.differential_equation(&DVector::zeros(2)),
            Err(DmpError::InvalidState { .. })
        ));
    }
}
