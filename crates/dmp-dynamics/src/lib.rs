//! First-order dynamical systems used as DMP building blocks.
//!
//! Provides:
//! - `DynamicalSystem`: the shared capability contract
//! - exact closed-form systems: exponential decay, sigmoid (logistic), linear
//!   time and critically damped spring-damper
//! - `SubSystem`: tagged variant over the concrete systems
//! - Fixed-step RK4 / forward Euler integrators for numerical cross-checks

pub mod exponential;
pub mod integrator;
pub mod sigmoid;
pub mod spring_damper;
pub mod subsystem;
pub mod system;
pub mod time;

pub use exponential::ExponentialSystem;
pub use integrator::{ForwardEuler, IntegrationOptions, Integrator, IntegratorType, RK4, integrate_numerically};
pub use sigmoid::SigmoidSystem;
pub use spring_damper::SpringDamperSystem;
pub use subsystem::SubSystem;
pub use system::DynamicalSystem;
pub use time::TimeSystem;
