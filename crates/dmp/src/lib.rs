//! Dynamic Movement Primitives.
//!
//! A [`Dmp`] couples a phase system, a gating system, an optional goal system
//! and one critically damped spring-damper per output dimension. Each
//! dimension is pushed by a forcing term `gating * fa(phase)` learned from a
//! demonstration with [`Dmp::from_traj`].
//!
//! The full state vector is laid out as `[y | z | goal | phase | gating]`, see
//! [`StateLayout`].

pub mod dmp;
pub mod layout;
pub mod variant;

pub use dmp::{DAMPING_COEFFICIENT, Dmp, DmpSolution};
pub use layout::StateLayout;
pub use variant::{DmpType, ForcingTermScaling, VariantSystems};
