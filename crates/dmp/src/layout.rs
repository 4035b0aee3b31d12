//! Index bookkeeping for the DMP state vector.

use std::ops::Range;

/// Position of each block inside a DMP state `[y | z | goal | phase | gating]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateLayout {
    dim: usize,
}

impl StateLayout {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Output dimension D.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Total state length, `3 D + 2`.
    pub fn dim_x(&self) -> usize {
        3 * self.dim + 2
    }

    pub fn y(&self) -> Range<usize> {
        0..self.dim
    }

    pub fn z(&self) -> Range<usize> {
        self.dim..2 * self.dim
    }

    /// `[y | z]`, the state of the spring-damper.
    pub fn spring(&self) -> Range<usize> {
        0..2 * self.dim
    }

    pub fn goal(&self) -> Range<usize> {
        2 * self.dim..3 * self.dim
    }

    pub fn phase(&self) -> usize {
        3 * self.dim
    }

    pub fn gating(&self) -> usize {
        3 * self.dim + 1
    }
}
