//! Time-indexed trajectories of positions, velocities and accelerations.
//!
//! A trajectory is the semantic view of a movement: what a demonstration
//! provides to `Dmp::from_traj`, and what a DMP integration is projected back
//! into. Rows are time samples, columns are output dimensions.

use crate::numeric::{Real, ensure_finite, ensure_len};
use crate::{DmpError, DmpResult};
use nalgebra::{DMatrix, DVector};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trajectory {
    ts: DVector<Real>,
    ys: DMatrix<Real>,
    yds: DMatrix<Real>,
    ydds: DMatrix<Real>,
}

impl Trajectory {
    /// Create a trajectory from equally sized sample matrices.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the times are empty or not strictly increasing, or
    /// if the sample matrices do not all have `ts.len()` rows and the same
    /// number of columns.
    pub fn new(
        ts: DVector<Real>,
        ys: DMatrix<Real>,
        yds: DMatrix<Real>,
        ydds: DMatrix<Real>,
    ) -> DmpResult<Self> {
        let n = ts.len();
        if n == 0 {
            return Err(DmpError::invalid_parameter("trajectory has no samples"));
        }
        let dim = ys.ncols();
        if dim == 0 {
            return Err(DmpError::invalid_parameter(
                "trajectory must have at least one dimension",
            ));
        }
        for (name, m) in [("ys", &ys), ("yds", &yds), ("ydds", &ydds)] {
            if m.nrows() != n || m.ncols() != dim {
                return Err(DmpError::invalid_parameter(format!(
                    "{name} is {}x{}, expected {n}x{dim}",
                    m.nrows(),
                    m.ncols()
                )));
            }
        }
        for &t in ts.iter() {
            ensure_finite(t, "trajectory time")?;
        }
        if let Some(i) = (1..n).find(|&i| ts[i] <= ts[i - 1]) {
            return Err(DmpError::invalid_parameter(format!(
                "trajectory times must be strictly increasing (index {i})"
            )));
        }
        Ok(Self { ts, ys, yds, ydds })
    }

    /// Minimum-jerk movement from `y_from` to `y_to` over the span of `ts`.
    ///
    /// Velocities and accelerations are zero at both ends.
    pub fn from_min_jerk(
        ts: &DVector<Real>,
        y_from: &DVector<Real>,
        y_to: &DVector<Real>,
    ) -> DmpResult<Self> {
        let n = ts.len();
        let dim = y_from.len();
        ensure_len(y_to, dim, "y_to")?;
        if n < 2 {
            return Err(DmpError::invalid_parameter(
                "minimum-jerk trajectory needs at least two time samples",
            ));
        }
        let t0 = ts[0];
        let duration = ts[n - 1] - t0;
        if duration <= 0.0 {
            return Err(DmpError::invalid_parameter(
                "minimum-jerk trajectory needs a positive duration",
            ));
        }

        let mut ys = DMatrix::zeros(n, dim);
        let mut yds = DMatrix::zeros(n, dim);
        let mut ydds = DMatrix::zeros(n, dim);
        for i in 0..n {
            let s = (ts[i] - t0) / duration;
            let (s2, s3) = (s * s, s * s * s);
            let pos = 10.0 * s3 - 15.0 * s3 * s + 6.0 * s3 * s2;
            let vel = (30.0 * s2 - 60.0 * s3 + 30.0 * s2 * s2) / duration;
            let acc = (60.0 * s - 180.0 * s2 + 120.0 * s3) / (duration * duration);
            for d in 0..dim {
                let range = y_to[d] - y_from[d];
                ys[(i, d)] = y_from[d] + range * pos;
                yds[(i, d)] = range * vel;
                ydds[(i, d)] = range * acc;
            }
        }
        Self::new(ts.clone(), ys, yds, ydds)
    }

    /// Rebuild a trajectory from the `[ts | ys | yds | ydds]` layout of [`Trajectory::as_matrix`].
    pub fn from_matrix(m: &DMatrix<Real>) -> DmpResult<Self> {
        if m.ncols() < 4 || (m.ncols() - 1) % 3 != 0 {
            return Err(DmpError::invalid_state(format!(
                "trajectory matrix has {} columns, expected 1 + 3*dim",
                m.ncols()
            )));
        }
        let dim = (m.ncols() - 1) / 3;
        let n = m.nrows();
        Self::new(
            m.column(0).into_owned(),
            m.view((0, 1), (n, dim)).into_owned(),
            m.view((0, 1 + dim), (n, dim)).into_owned(),
            m.view((0, 1 + 2 * dim), (n, dim)).into_owned(),
        )
    }

    /// Pack the trajectory into one matrix with columns `[ts | ys | yds | ydds]`.
    pub fn as_matrix(&self) -> DMatrix<Real> {
        let n = self.len();
        let dim = self.dim();
        let mut m = DMatrix::zeros(n, 1 + 3 * dim);
        m.set_column(0, &self.ts);
        m.view_mut((0, 1), (n, dim)).copy_from(&self.ys);
        m.view_mut((0, 1 + dim), (n, dim)).copy_from(&self.yds);
        m.view_mut((0, 1 + 2 * dim), (n, dim)).copy_from(&self.ydds);
        m
    }

    /// Concatenate `other` after this trajectory.
    ///
    /// The first sample of `other` is taken to coincide with the last sample of
    /// `self`; it is dropped and the remaining times are shifted accordingly.
    pub fn append(&self, other: &Trajectory) -> DmpResult<Self> {
        if other.dim() != self.dim() {
            return Err(DmpError::invalid_parameter(format!(
                "cannot append a {}-dimensional trajectory to a {}-dimensional one",
                other.dim(),
                self.dim()
            )));
        }
        let n_self = self.len();
        let n_new = other.len() - 1;
        let n = n_self + n_new;
        let dim = self.dim();
        let offset = self.ts[n_self - 1] - other.ts[0];

        let ts = DVector::from_fn(n, |i, _| {
            if i < n_self {
                self.ts[i]
            } else {
                other.ts[i - n_self + 1] + offset
            }
        });
        let stack = |a: &DMatrix<Real>, b: &DMatrix<Real>| {
            DMatrix::from_fn(n, dim, |i, d| {
                if i < n_self {
                    a[(i, d)]
                } else {
                    b[(i - n_self + 1, d)]
                }
            })
        };
        Self::new(
            ts,
            stack(&self.ys, &other.ys),
            stack(&self.yds, &other.yds),
            stack(&self.ydds, &other.ydds),
        )
    }

    pub fn len(&self) -> usize {
        self.ts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ts.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.ys.ncols()
    }

    /// Time span covered by the samples.
    pub fn duration(&self) -> Real {
        self.ts[self.len() - 1] - self.ts[0]
    }

    pub fn ts(&self) -> &DVector<Real> {
        &self.ts
    }

    pub fn ys(&self) -> &DMatrix<Real> {
        &self.ys
    }

    pub fn yds(&self) -> &DMatrix<Real> {
        &self.yds
    }

    pub fn ydds(&self) -> &DMatrix<Real> {
        &self.ydds
    }

    pub fn y_init(&self) -> DVector<Real> {
        self.ys.row(0).transpose()
    }

    pub fn y_final(&self) -> DVector<Real> {
        self.ys.row(self.len() - 1).transpose()
    }
}
