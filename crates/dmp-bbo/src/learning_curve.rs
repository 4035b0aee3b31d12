//! Per-update performance record.

use dmp_core::{DmpError, Real};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearningCurveRow {
    /// Samples rolled out before this update.
    pub n_samples: usize,
    /// Total cost of the distribution mean.
    pub cost_eval: Real,
    /// Square root of the largest covariance eigenvalue.
    pub exploration: Real,
}

/// Append-only sequence of rows with strictly increasing sample counts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningCurve {
    rows: Vec<LearningCurveRow>,
}

impl LearningCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// `InvalidParameter` if `row.n_samples` does not exceed the last recorded count.
    pub fn push(&mut self, row: LearningCurveRow) -> Result<(), DmpError> {
        if let Some(last) = self.rows.last() {
            if row.n_samples <= last.n_samples {
                return Err(DmpError::invalid_parameter(format!(
                    "learning curve sample count must increase ({} after {})",
                    row.n_samples, last.n_samples
                )));
            }
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[LearningCurveRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&LearningCurveRow> {
        self.rows.last()
    }

    /// Rows as an `n x 3` matrix `[n_samples | cost_eval | exploration]`.
    pub fn as_matrix(&self) -> DMatrix<Real> {
        DMatrix::from_fn(self.rows.len(), 3, |i, j| {
            let row = &self.rows[i];
            match j {
                0 => row.n_samples as Real,
                1 => row.cost_eval,
                _ => row.exploration,
            }
        })
    }
}
