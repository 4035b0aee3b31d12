//! Black-box optimization of parameter vectors with evolution strategies.
//!
//! The loop in [`run_optimization_task`] repeatedly
//! 1. evaluates the mean of a Gaussian [`Distribution`],
//! 2. samples perturbations and rolls them out with a [`TaskSolver`],
//! 3. scores the rollouts with a [`Task`],
//! 4. lets an [`Updater`] turn samples and costs into a new distribution.
//!
//! [`DmpTaskSolver`] and [`ViapointTask`] connect the loop to DMPs.

pub mod config;
pub mod distribution;
pub mod dmp_task;
pub mod error;
pub mod learning_curve;
pub mod optimizer;
pub mod progress;
pub mod task;
pub mod updater;
pub mod weighting;

pub use config::OptimizationConfig;
pub use distribution::Distribution;
pub use dmp_task::{DmpTaskSolver, ViapointTask};
pub use error::{BboError, BboResult};
pub use learning_curve::{LearningCurve, LearningCurveRow};
pub use optimizer::{OptimizationRun, UpdateSummary, resume_optimization_task, run_optimization_task};
pub use progress::{OptimizationEvent, OptimizationStage};
pub use task::{Rollout, Task, TaskSolver};
pub use updater::{Updater, UpdaterCovarAdaptation, UpdaterCovarDecay, UpdaterMean};
pub use weighting::WeightingMethod;
