//! Ensemble Client - Connection handles for coordination-service ensembles
//!
//! Provides:
//! - The [`ClientBuilder`] and [`CoordinationClient`] seams a connection
//!   factory is written against
//! - Connect-string parsing and namespace path helpers
//! - [`EnsembleClient`], a handle that supervises connectivity to an
//!   ensemble member using the configured timeouts and retry policy
//!
//! # Example
//!
//! ```no_run
//! use ensemble_client::{ClientBuilder, CoordinationClient, EnsembleClientBuilder};
//!
//! # async fn example() -> ensemble_core::Result<()> {
//! let client = EnsembleClientBuilder::new()
//!     .connect_string("zk1:2181,zk2:2181")
//!     .namespace("app")
//!     .build()?;
//! client.start().await?;
//! assert_eq!(client.namespaced_path("/locks")?, "/app/locks");
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod client;
mod connect_string;
pub mod paths;

pub use builder::{ClientBuilder, ClientOptions, CoordinationClient, EnsembleClientBuilder};
pub use client::EnsembleClient;
pub use connect_string::{EnsembleAddress, ServerAddress, DEFAULT_PORT};
