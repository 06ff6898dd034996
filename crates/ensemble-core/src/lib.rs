//! Ensemble Core - Foundation for coordination-service connections
//!
//! Provides the error type, connection configuration, retry policies and
//! compression providers shared by the client, host and factory crates.

pub mod compression;
pub mod config;
pub mod error;
pub mod retry;
pub mod state;

pub use compression::{CompressionProvider, GzipCompressionProvider, NoCompressionProvider};
pub use config::{CompressionConfig, ConnectionConfig, ConnectionSettings, RetryPolicyConfig};
pub use error::{Error, Result};
pub use retry::{
    ExponentialBackoffRetry, RetryForever, RetryNTimes, RetryOneTime, RetryPolicy,
    RetryUntilElapsed,
};
pub use state::ConnectionState;
