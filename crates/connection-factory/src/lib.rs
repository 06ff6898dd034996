//! Connection factory for coordination-service ensembles
//!
//! This crate turns a [`ConnectionConfig`] into a configured client handle
//! and registers it with the host before handing it back:
//! - **Lifecycle**: the handle is started with the host and closed on shutdown
//! - **Health**: a probe named `curator` reports live connectivity
//! - **Admin**: an HTTP router exposing the health checks
//!
//! # Example
//!
//! ```ignore
//! use connection_factory::ConnectionFactory;
//! use ensemble_core::ConnectionSettings;
//! use host::Environment;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (environment, lifecycle, _health) = Environment::standalone();
//!     let config = ConnectionSettings::load("ensemble.json")?.into_config()?;
//!     let client = ConnectionFactory::new(environment).build(&config)?;
//!     lifecycle.start_all().await?;
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod factory;
pub mod health;
pub mod managed;

pub use factory::{ConnectionFactory, HEALTH_CHECK_NAME};
pub use health::ClientHealthCheck;
pub use managed::ManagedClient;

pub use ensemble_core::ConnectionConfig;
