//! dmp-core: shared foundation for the movement primitive crates.
//!
//! Contains:
//! - numeric (Real + validation and matrix helpers)
//! - error (shared error taxonomy)
//! - trajectory (time-indexed position/velocity/acceleration samples)

pub mod error;
pub mod numeric;
pub mod trajectory;

pub use error::{DmpError, DmpResult};
pub use numeric::*;
pub use trajectory::Trajectory;
