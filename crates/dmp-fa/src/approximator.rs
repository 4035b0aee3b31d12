//! Capability contract consumed by the DMP.

use crate::error::FaResult;
use dmp_core::Real;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

/// A trainable mapping from inputs (one row per sample) to one scalar output per sample.
///
/// A DMP owns one approximator per output dimension; each is trained on the
/// phase as input and the forcing-term targets of its dimension as output.
pub trait FunctionApproximator: Debug + Send + Sync {
    /// Fit the model to `targets` (one per row of `inputs`).
    fn train(&mut self, inputs: &DMatrix<Real>, targets: &DVector<Real>) -> FaResult<()>;

    /// Predict one output per row of `inputs`.
    fn predict(&self, inputs: &DMatrix<Real>) -> FaResult<DVector<Real>>;

    fn is_trained(&self) -> bool;

    /// Model parameters exposed to black-box optimization.
    fn parameter_vector(&self) -> FaResult<DVector<Real>>;

    /// Overwrite the parameters returned by [`FunctionApproximator::parameter_vector`].
    fn set_parameter_vector(&mut self, values: &DVector<Real>) -> FaResult<()>;

    /// Number of entries in the parameter vector (0 while untrained).
    fn parameter_vector_size(&self) -> usize {
        self.parameter_vector().map(|v| v.len()).unwrap_or(0)
    }

    fn name(&self) -> &'static str;

    fn box_clone(&self) -> Box<dyn FunctionApproximator>;
}

impl Clone for Box<dyn FunctionApproximator> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}
