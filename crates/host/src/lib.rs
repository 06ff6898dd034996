//! Host - Lifecycle and health-check registries
//!
//! Components that own resources register with the [`Lifecycle`] to be
//! started and stopped with the process; components that can report their
//! own condition register a named [`HealthCheck`]. Both capabilities travel
//! together as an [`Environment`].

pub mod environment;
pub mod health;
pub mod lifecycle;

pub use environment::Environment;
pub use health::{HealthCheck, HealthCheckRegistry, HealthCheckResult, HealthRegistry};
pub use lifecycle::{Lifecycle, LifecycleManager, Managed};
