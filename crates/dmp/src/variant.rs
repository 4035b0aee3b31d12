//! Formulation variants and their subsystem policies.

use dmp_core::{DmpResult, Real};
use dmp_dynamics::{ExponentialSystem, SigmoidSystem, SubSystem, TimeSystem};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// DMP formulation. Each variant fixes how the phase, gating and goal systems
/// are built; see [`DmpType::subsystems`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DmpType {
    /// Exponential phase and gating, goal jumps directly to the attractor.
    Ijspeert2002Movement,
    /// Linear phase, sigmoid gating and a goal that moves smoothly from the
    /// start to the attractor. Suited to chaining movements.
    #[default]
    Kulvicius2012Joining,
    /// As `Kulvicius2012Joining`, with the phase counting down from 1 to 0.
    Countdown2013,
}

/// How the forcing term adapts when the movement amplitude differs from the
/// trained one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForcingTermScaling {
    #[default]
    NoScaling,
    /// Scale by `(goal - y_init) / (goal_trained - y_init_trained)` per dimension.
    GMinusY0,
}

/// Subsystems of one DMP, as built by a [`DmpType`].
#[derive(Clone, Debug, PartialEq)]
pub struct VariantSystems {
    /// `None` when the goal is held at the attractor.
    pub goal: Option<SubSystem>,
    pub phase: SubSystem,
    pub gating: SubSystem,
}

const PHASE_ALPHA: Real = 4.0;
const GOAL_ALPHA: Real = 15.0;
const GATING_MAX_RATE: Real = -10.0;
const GATING_INFLECTION_RATIO: Real = 0.9;

impl DmpType {
    pub fn name(self) -> &'static str {
        match self {
            DmpType::Ijspeert2002Movement => "IJSPEERT_2002_MOVEMENT",
            DmpType::Kulvicius2012Joining => "KULVICIUS_2012_JOINING",
            DmpType::Countdown2013 => "COUNTDOWN_2013",
        }
    }

    /// Build the phase, gating and goal systems of this variant.
    pub fn subsystems(
        self,
        tau: Real,
        y_init: &DVector<Real>,
        y_attr: &DVector<Real>,
    ) -> DmpResult<VariantSystems> {
        let one = DVector::from_element(1, 1.0);
        let zero = DVector::from_element(1, 0.0);
        let sigmoid_gating = || -> DmpResult<SubSystem> {
            Ok(SigmoidSystem::new(tau, one.clone(), GATING_MAX_RATE, GATING_INFLECTION_RATIO)?.into())
        };
        let smooth_goal = || -> DmpResult<SubSystem> {
            Ok(ExponentialSystem::new(tau, y_init.clone(), y_attr.clone(), GOAL_ALPHA)?.into())
        };

        match self {
            DmpType::Ijspeert2002Movement => Ok(VariantSystems {
                goal: None,
                phase: ExponentialSystem::new(tau, one.clone(), zero.clone(), PHASE_ALPHA)?.into(),
                gating: ExponentialSystem::new(tau, one.clone(), zero.clone(), PHASE_ALPHA)?.into(),
            }),
            DmpType::Kulvicius2012Joining => Ok(VariantSystems {
                goal: Some(smooth_goal()?),
                phase: TimeSystem::new(tau, false)?.into(),
                gating: sigmoid_gating()?,
            }),
            DmpType::Countdown2013 => Ok(VariantSystems {
                goal: Some(smooth_goal()?),
                phase: TimeSystem::new(tau, true)?.into(),
                gating: sigmoid_gating()?,
            }),
        }
    }
}

impl std::fmt::Display for DmpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
