//! Radial basis function network.

use crate::approximator::FunctionApproximator;
use crate::error::{FaError, FaResult};
use dmp_core::Real;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for [`Rbfn`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RbfnConfig {
    /// Basis functions per input dimension; the grid holds `n^dim_in` kernels.
    pub n_basis_functions: usize,
    /// Value at which two neighboring kernels intersect, in (0, 1).
    pub intersection_height: Real,
    /// Ridge term added to the normal equations.
    pub regularization: Real,
    /// Divide each activation by the sum of all activations at that input.
    pub normalized: bool,
}

impl Default for RbfnConfig {
    fn default() -> Self {
        Self {
            n_basis_functions: 10,
            intersection_height: 0.7,
            regularization: 1e-9,
            normalized: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Model {
    /// n_kernels x dim_in
    centers: DMatrix<Real>,
    /// n_kernels x dim_in
    widths: DMatrix<Real>,
    weights: DVector<Real>,
}

/// Gaussian kernels on a regular grid spanning the training inputs, combined
/// linearly. Centers and widths are fixed at training time; only the weights
/// are exposed as parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rbfn {
    config: RbfnConfig,
    model: Option<Model>,
}

impl Rbfn {
    pub fn new(config: RbfnConfig) -> FaResult<Self> {
        if config.n_basis_functions == 0 {
            return Err(FaError::InvalidConfig {
                what: "n_basis_functions must be at least 1".to_string(),
            });
        }
        let h = config.intersection_height;
        if !(h > 0.0 && h < 1.0) {
            return Err(FaError::InvalidConfig {
                what: format!("intersection_height must lie in (0, 1), got {h}"),
            });
        }
        if !(config.regularization >= 0.0 && config.regularization.is_finite()) {
            return Err(FaError::InvalidConfig {
                what: format!("regularization must be non-negative, got {}", config.regularization),
            });
        }
        Ok(Self {
            config,
            model: None,
        })
    }

    pub fn config(&self) -> &RbfnConfig {
        &self.config
    }

    /// Kernel activations (n_samples x n_kernels) of the trained model.
    pub fn kernel_activations(&self, inputs: &DMatrix<Real>) -> FaResult<DMatrix<Real>> {
        let model = self.model.as_ref().ok_or(FaError::NotTrained)?;
        check_input_dim(inputs, model.centers.ncols())?;
        Ok(kernel_activations(
            &model.centers,
            &model.widths,
            inputs,
            self.config.normalized,
        ))
    }

    pub fn centers(&self) -> Option<&DMatrix<Real>> {
        self.model.as_ref().map(|m| &m.centers)
    }

    pub fn widths(&self) -> Option<&DMatrix<Real>> {
        self.model.as_ref().map(|m| &m.widths)
    }

    /// Grid of centers spanning each input column, and the matching widths.
    fn grid(&self, inputs: &DMatrix<Real>) -> (DMatrix<Real>, DMatrix<Real>) {
        let n = self.config.n_basis_functions;
        let dim_in = inputs.ncols();
        let n_kernels = n.pow(dim_in as u32);
        // Half the spacing between centers must map to the intersection height
        let width_factor = (-2.0 * self.config.intersection_height.ln()).sqrt();

        let mut centers = DMatrix::zeros(n_kernels, dim_in);
        let mut widths = DMatrix::zeros(n_kernels, dim_in);
        for d in 0..dim_in {
            let col = inputs.column(d);
            let (lo, hi) = (col.min(), col.max());
            let spacing = if n > 1 { (hi - lo) / (n - 1) as Real } else { hi - lo };
            let spacing = if spacing > 0.0 { spacing } else { 1.0 };
            let width = 0.5 * spacing / width_factor;
            let stride = n.pow(d as u32);
            for k in 0..n_kernels {
                let idx = (k / stride) % n;
                centers[(k, d)] = if n > 1 {
                    lo + idx as Real * spacing
                } else {
                    0.5 * (lo + hi)
                };
                widths[(k, d)] = width;
            }
        }
        (centers, widths)
    }
}

impl Default for Rbfn {
    fn default() -> Self {
        Self {
            config: RbfnConfig::default(),
            model: None,
        }
    }
}

fn check_input_dim(inputs: &DMatrix<Real>, dim_in: usize) -> FaResult<()> {
    if inputs.ncols() != dim_in {
        return Err(FaError::ShapeMismatch {
            what: format!("expected {dim_in} input columns, got {}", inputs.ncols()),
        });
    }
    Ok(())
}

fn kernel_activations(
    centers: &DMatrix<Real>,
    widths: &DMatrix<Real>,
    inputs: &DMatrix<Real>,
    normalized: bool,
) -> DMatrix<Real> {
    let n_kernels = centers.nrows();
    if normalized && n_kernels == 1 {
        return DMatrix::from_element(inputs.nrows(), 1, 1.0);
    }

    // Diagonal covariance: the multivariate Gaussian is a product over dimensions
    let mut acts = DMatrix::from_fn(inputs.nrows(), n_kernels, |i, k| {
        (0..inputs.ncols())
            .map(|d| {
                let diff = inputs[(i, d)] - centers[(k, d)];
                let w = widths[(k, d)];
                (-0.5 * diff * diff / (w * w)).exp()
            })
            .product::<Real>()
    });

    if normalized {
        for mut row in acts.row_iter_mut() {
            let sum = row.sum();
            if sum > 0.0 {
                row /= sum;
            }
        }
    }
    acts
}

impl FunctionApproximator for Rbfn {
    fn train(&mut self, inputs: &DMatrix<Real>, targets: &DVector<Real>) -> FaResult<()> {
        let n = inputs.nrows();
        if n == 0 || inputs.ncols() == 0 {
            return Err(FaError::ShapeMismatch {
                what: "training inputs must not be empty".to_string(),
            });
        }
        if targets.len() != n {
            return Err(FaError::ShapeMismatch {
                what: format!("{n} input rows but {} targets", targets.len()),
            });
        }
        if inputs.iter().chain(targets.iter()).any(|v| !v.is_finite()) {
            return Err(FaError::ConvergenceFailure {
                what: "training data contains non-finite values".to_string(),
            });
        }

        let (centers, widths) = self.grid(inputs);
        let acts = kernel_activations(&centers, &widths, inputs, self.config.normalized);

        let mut gram = acts.transpose() * &acts;
        for k in 0..gram.nrows() {
            gram[(k, k)] += self.config.regularization;
        }
        let rhs = acts.transpose() * targets;
        let chol = gram.cholesky().ok_or_else(|| FaError::ConvergenceFailure {
            what: "normal equations are singular; increase regularization".to_string(),
        })?;
        let weights = chol.solve(&rhs);
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(FaError::ConvergenceFailure {
                what: "least-squares weights are not finite".to_string(),
            });
        }

        debug!(
            n_samples = n,
            n_kernels = weights.len(),
            "trained RBFN"
        );
        self.model = Some(Model {
            centers,
            widths,
            weights,
        });
        Ok(())
    }

    fn predict(&self, inputs: &DMatrix<Real>) -> FaResult<DVector<Real>> {
        let model = self.model.as_ref().ok_or(FaError::NotTrained)?;
        check_input_dim(inputs, model.centers.ncols())?;
        let acts = kernel_activations(
            &model.centers,
            &model.widths,
            inputs,
            self.config.normalized,
        );
        Ok(acts * &model.weights)
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    fn parameter_vector(&self) -> FaResult<DVector<Real>> {
        self.model
            .as_ref()
            .map(|m| m.weights.clone())
            .ok_or(FaError::NotTrained)
    }

    fn set_parameter_vector(&mut self, values: &DVector<Real>) -> FaResult<()> {
        let model = self.model.as_mut().ok_or(FaError::NotTrained)?;
        if values.len() != model.weights.len() {
            return Err(FaError::ShapeMismatch {
                what: format!(
                    "expected {} parameters, got {}",
                    model.weights.len(),
                    values.len()
                ),
            });
        }
        model.weights.copy_from(values);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "rbfn"
    }

    fn box_clone(&self) -> Box<dyn FunctionApproximator> {
        Box::new(self.clone())
    }
}
