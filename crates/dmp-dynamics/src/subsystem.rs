//! Tagged variant over the concrete dynamical systems.

use crate::exponential::ExponentialSystem;
use crate::sigmoid::SigmoidSystem;
use crate::spring_damper::SpringDamperSystem;
use crate::system::DynamicalSystem;
use crate::time::TimeSystem;
use dmp_core::{DmpError, DmpResult, Real};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Any of the closed-form systems a composite system can own by value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SubSystem {
    Exponential(ExponentialSystem),
    Sigmoid(SigmoidSystem),
    Time(TimeSystem),
    SpringDamper(SpringDamperSystem),
}

macro_rules! dispatch {
    ($self:expr, $sys:ident => $body:expr) => {
        match $self {
            SubSystem::Exponential($sys) => $body,
            SubSystem::Sigmoid($sys) => $body,
            SubSystem::Time($sys) => $body,
            SubSystem::SpringDamper($sys) => $body,
        }
    };
}

impl SubSystem {
    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SubSystem::Exponential(_) => "exponential",
            SubSystem::Sigmoid(_) => "sigmoid",
            SubSystem::Time(_) => "time",
            SubSystem::SpringDamper(_) => "spring-damper",
        }
    }

    /// Move the attractor, for the systems that have one.
    ///
    /// # Errors
    ///
    /// `InvalidState` on a length mismatch, `InvalidParameter` for systems
    /// whose end state is fixed by construction (sigmoid, time).
    pub fn set_x_attr(&mut self, x_attr: DVector<Real>) -> DmpResult<()> {
        let kind = self.kind();
        match self {
            SubSystem::Exponential(sys) => sys.set_x_attr(x_attr),
            SubSystem::SpringDamper(sys) => sys.set_y_attr(x_attr),
            SubSystem::Sigmoid(_) | SubSystem::Time(_) => Err(DmpError::invalid_parameter(
                format!("{kind} system has no settable attractor"),
            )),
        }
    }

    pub fn set_x_init(&mut self, x_init: DVector<Real>) -> DmpResult<()> {
        match self {
            SubSystem::Exponential(sys) => sys.set_x_init(x_init),
            SubSystem::Sigmoid(sys) => sys.set_x_init(x_init),
            SubSystem::SpringDamper(sys) => sys.set_x_init(x_init),
            SubSystem::Time(_) => Err(DmpError::invalid_parameter(
                "time system starts at a fixed phase",
            )),
        }
    }
}

impl DynamicalSystem for SubSystem {
    fn dim_x(&self) -> usize {
        dispatch!(self, sys => sys.dim_x())
    }

    fn dim_y(&self) -> usize {
        dispatch!(self, sys => sys.dim_y())
    }

    fn tau(&self) -> Real {
        dispatch!(self, sys => sys.tau())
    }

    fn set_tau(&mut self, tau: Real) -> DmpResult<()> {
        dispatch!(self, sys => sys.set_tau(tau))
    }

    fn x_init(&self) -> &DVector<Real> {
        dispatch!(self, sys => sys.x_init())
    }

    fn differential_equation(&self, x: &DVector<Real>) -> DmpResult<DVector<Real>> {
        dispatch!(self, sys => sys.differential_equation(x))
    }

    fn analytical_solution(&self, ts: &DVector<Real>) -> DmpResult<(DMatrix<Real>, DMatrix<Real>)> {
        dispatch!(self, sys => sys.analytical_solution(ts))
    }

    fn integrate_step(&self, dt: Real, x: &DVector<Real>) -> DmpResult<(DVector<Real>, DVector<Real>)> {
        dispatch!(self, sys => sys.integrate_step(dt, x))
    }
}

impl From<ExponentialSystem> for SubSystem {
    fn from(sys: ExponentialSystem) -> Self {
        SubSystem::Exponential(sys)
    }
}

impl From<SigmoidSystem> for SubSystem {
    fn from(sys: SigmoidSystem) -> Self {
        SubSystem::Sigmoid(sys)
    }
}

impl From<TimeSystem> for SubSystem {
    fn from(sys: TimeSystem) -> Self {
        SubSystem::Time(sys)
    }
}

impl From<SpringDamperSystem> for SubSystem {
    fn from(sys: SpringDamperSystem) -> Self {
        SubSystem::SpringDamper(sys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_preserves_behavior() {
        let exp = ExponentialSystem::new(
            1.0,
            DVector::from_element(1, 1.0),
            DVector::from_element(1, 0.0),
            4.0,
        )
        .unwrap();
        let sub = SubSystem::from(exp.clone());
        let x = DVector::from_element(1, 0.3);
        assert_eq!(
            sub.differential_equation(&x).unwrap(),
            exp.differential_equation(&x).unwrap()
        );
        assert_eq!(
            sub.integrate_step(0.1, &x).unwrap(),
            exp.integrate_step(0.1, &x).unwrap()
        );
        assert_eq!(sub.kind(), "exponential");
    }

    #[test]
    fn attractor_only_where_it_exists() {
        let mut time = SubSystem::from(TimeSystem::new(1.0, false).unwrap());
        assert!(time.set_x_attr(DVector::from_element(1, 1.0)).is_err());

        let mut goal = SubSystem::from(
            ExponentialSystem::new(
                1.0,
                DVector::from_element(2, 0.0),
                DVector::from_element(2, 1.0),
                15.0,
            )
            .unwrap(),
        );
        assert!(goal.set_x_attr(DVector::from_element(2, 2.0)).is_ok());
        assert!(goal.set_x_attr(DVector::from_element(1, 2.0)).is_err());
    }

    #[test]
    fn tau_propagates_through_variant() {
        let mut sub = SubSystem::from(TimeSystem::new(1.0, true).unwrap());
        sub.set_tau(2.0).unwrap();
        assert_eq!(sub.tau(), 2.0);
        assert!(sub.set_tau(0.0).is_err());
    }
}
