//! Function approximators that learn DMP forcing terms.
//!
//! The DMP only relies on the [`FunctionApproximator`] capability contract
//! (train on targets, predict outputs, expose a parameter vector for
//! optimization). [`Rbfn`] is the bundled implementation: Gaussian kernels on
//! a regular grid with linear weights fitted by regularized least squares.

pub mod approximator;
pub mod error;
pub mod rbfn;

pub use approximator::FunctionApproximator;
pub use error::{FaError, FaResult};
pub use rbfn::{Rbfn, RbfnConfig};
