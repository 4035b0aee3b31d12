//! Sigmoid (logistic) system, used for gating the forcing term.

use crate::system::DynamicalSystem;
use dmp_core::{DmpError, DmpResult, Real, ensure_finite, ensure_len, ensure_positive, ensure_time_sequence};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Logistic dynamics: `xd = max_rate * x * (1 - x / K) / tau`.
///
/// The carrying capacity `K` is chosen per dimension so that the inflection
/// point of the sigmoid lies at `inflection_ratio * tau`:
/// `K = x_init * (1 + exp(max_rate * inflection_ratio))`.
/// With a negative `max_rate` the state starts just below `K` and decays
/// towards zero, dropping fastest around the inflection time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SigmoidSystem {
    tau: Real,
    x_init: DVector<Real>,
    max_rate: Real,
    inflection_ratio: Real,
    ks: DVector<Real>,
}

impl SigmoidSystem {
    pub fn new(
        tau: Real,
        x_init: DVector<Real>,
        max_rate: Real,
        inflection_ratio: Real,
    ) -> DmpResult<Self> {
        ensure_positive(tau, "tau")?;
        ensure_positive(inflection_ratio, "inflection_ratio")?;
        if ensure_finite(max_rate, "max_rate")? == 0.0 {
            return Err(DmpError::invalid_parameter("max_rate must be non-zero"));
        }
        if x_init.is_empty() {
            return Err(DmpError::invalid_state("x_init must not be empty"));
        }
        let ks = compute_ks(&x_init, max_rate, inflection_ratio)?;
        Ok(Self {
            tau,
            x_init,
            max_rate,
            inflection_ratio,
            ks,
        })
    }

    pub fn max_rate(&self) -> Real {
        self.max_rate
    }

    pub fn inflection_ratio(&self) -> Real {
        self.inflection_ratio
    }

    /// Carrying capacity per dimension.
    pub fn ks(&self) -> &DVector<Real> {
        &self.ks
    }

    pub fn set_x_init(&mut self, x_init: DVector<Real>) -> DmpResult<()> {
        ensure_len(&x_init, self.dim_x(), "x_init")?;
        self.ks = compute_ks(&x_init, self.max_rate, self.inflection_ratio)?;
        self.x_init = x_init;
        Ok(())
    }

    /// State reached after `dt` when starting from `x`.
    fn advance(&self, x: &DVector<Real>, dt: Real) -> DVector<Real> {
        let exp_rt = (-self.max_rate * dt / self.tau).exp();
        DVector::from_fn(x.len(), |d, _| {
            let k = self.ks[d];
            if x[d] == 0.0 {
                // Zero is a fixed point of the logistic equation
                0.0
            } else {
                let b = k / x[d] - 1.0;
                k / (1.0 + b * exp_rt)
            }
        })
    }
}

fn compute_ks(x_init: &DVector<Real>, max_rate: Real, inflection_ratio: Real) -> DmpResult<DVector<Real>> {
    // N(t) = K / (1 + (K/N_0 - 1) exp(-r t)) and N(t_infl) = K/2
    //   => K = N_0 (1 + exp(r t_infl)), with time measured in units of tau
    let factor = 1.0 + (max_rate * inflection_ratio).exp();
    ensure_finite(factor, "sigmoid carrying capacity")?;
    if let Some(d) = x_init.iter().position(|&x| x == 0.0) {
        return Err(DmpError::invalid_parameter(format!(
            "sigmoid x_init must be non-zero (dimension {d})"
        )));
    }
    let ks = x_init * factor;
    if (factor - 1.0).abs() < 1e-8 {
        warn!(
            factor,
            "sigmoid carrying capacity is almost equal to x_init; the system will barely move"
        );
    }
    Ok(ks)
}

impl DynamicalSystem for SigmoidSystem {
    fn dim_x(&self) -> usize {
        self.x_init.len()
    }

    fn tau(&self) -> Real {
        self.tau
    }

    fn set_tau(&mut self, tau: Real) -> DmpResult<()> {
        // K depends on the inflection ratio only, so it survives a change of tau
        self.tau = ensure_positive(tau, "tau")?;
        Ok(())
    }

    fn x_init(&self) -> &DVector<Real> {
        &self.x_init
    }

    fn differential_equation(&self, x: &DVector<Real>) -> DmpResult<DVector<Real>> {
        ensure_len(x, self.dim_x(), "state")?;
        Ok(DVector::from_fn(x.len(), |d, _| {
            self.max_rate * x[d] * (1.0 - x[d] / self.ks[d]) / self.tau
        }))
    }

    fn analytical_solution(&self, ts: &DVector<Real>) -> DmpResult<(DMatrix<Real>, DMatrix<Real>)> {
        ensure_time_sequence(ts)?;
        let n = ts.len();
        let dim = self.dim_x();
        let r = self.max_rate / self.tau;
        let exp_rt = ts.map(|t| (-r * t).exp());

        let mut xs = DMatrix::zeros(n, dim);
        let mut xds = DMatrix::zeros(n, dim);
        for d in 0..dim {
            let k = self.ks[d];
            let b = k / self.x_init[d] - 1.0;
            for i in 0..n {
                let denom = 1.0 + b * exp_rt[i];
                xs[(i, d)] = k / denom;
                xds[(i, d)] = k * r * b * exp_rt[i] / (denom * denom);
            }
        }
        Ok((xs, xds))
    }

    fn integrate_step(&self, dt: Real, x: &DVector<Real>) -> DmpResult<(DVector<Real>, DVector<Real>)> {
        ensure_positive(dt, "dt")?;
        ensure_len(x, self.dim_x(), "state")?;
        let x_new = self.advance(x, dt);
        let xd_new = self.differential_equation(&x_new)?;
        Ok((x_new, xd_new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmp_core::{linspace, max_abs_diff};

    fn gating(tau: Real) -> SigmoidSystem {
        SigmoidSystem::new(tau, DVector::from_element(1, 1.0), -10.0, 0.9).unwrap()
    }

    #[test]
    fn inflection_point_at_ratio_of_tau() {
        let sys = gating(0.5);
        let ts = DVector::from_vec(vec![0.0, 0.45, 0.5]);
        let (xs, _) = sys.analytical_solution(&ts).unwrap();
        let k = sys.ks()[0];
        assert!((xs[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((xs[(1, 0)] - 0.5 * k).abs() < 1e-9);
        // One tenth of tau after the inflection point: K / (1 + e)
        assert!((xs[(2, 0)] - k / (1.0 + 1.0f64.exp())).abs() < 1e-9);
    }

    #[test]
    fn stepping_matches_analytical_solution() {
        let sys = gating(0.5);
        let ts = linspace(0.0, 0.7, 71);
        let (xs_ana, xds_ana) = sys.analytical_solution(&ts).unwrap();
        let (mut x, _) = sys.integrate_start().unwrap();
        for i in 1..ts.len() {
            let (x_new, xd_new) = sys.integrate_step(ts[i] - ts[i - 1], &x).unwrap();
            assert!((x_new[0] - xs_ana[(i, 0)]).abs() < 1e-10);
            assert!((xd_new[0] - xds_ana[(i, 0)]).abs() < 1e-8);
            x = x_new;
        }
    }

    #[test]
    fn closed_form_derivative_matches_differential_equation() {
        let sys = gating(1.0);
        let ts = linspace(0.0, 1.2, 13);
        let (xs, xds) = sys.analytical_solution(&ts).unwrap();
        for i in 0..ts.len() {
            let xd = sys.differential_equation(&xs.row(i).transpose()).unwrap();
            assert!((xd[0] - xds[(i, 0)]).abs() < 1e-9);
        }
    }

    #[test]
    fn rk4_agrees_with_closed_form() {
        let sys = gating(0.5);
        let ts = linspace(0.0, 0.5, 11);
        let (xs_ana, _) = sys.analytical_solution(&ts).unwrap();
        let (xs_num, _) =
            crate::integrate_numerically(&sys, &ts, &crate::IntegrationOptions::default()).unwrap();
        assert!(max_abs_diff(&xs_ana, &xs_num) < 1e-8);
    }

    #[test]
    fn tau_change_keeps_shape() {
        let mut sys = gating(0.5);
        sys.set_tau(1.0).unwrap();
        let (xs, _) = sys
            .analytical_solution(&DVector::from_element(1, 0.9))
            .unwrap();
        assert!((xs[(0, 0)] - 0.5 * sys.ks()[0]).abs() < 1e-9);
        assert!(sys.set_tau(-1.0).is_err());
    }

    #[test]
    fn rejects_zero_initial_state_and_rate() {
        assert!(SigmoidSystem::new(1.0, DVector::from_element(1, 0.0), -10.0, 0.9).is_err());
        assert!(SigmoidSystem::new(1.0, DVector::from_element(1, 1.0), 0.0, 0.9).is_err());
    }
}
