//! Client builder and handle traits
//!
//! A connection factory is written against these two seams so any
//! coordination-service client can be substituted.

use async_trait::async_trait;
use std::sync::Arc;

use ensemble_core::config::to_millis;
use ensemble_core::{
    CompressionProvider, ConnectionConfig, ConnectionState, Error, Result, RetryPolicy,
};

use crate::client::EnsembleClient;

/// Fluent configuration API of a coordination client
pub trait ClientBuilder: Sized + Send {
    /// Handle produced by [`ClientBuilder::build`]
    type Client: CoordinationClient;

    /// Maximum time to establish a connection, in milliseconds
    fn connection_timeout_ms(self, timeout_ms: u64) -> Self;

    /// Session timeout, in milliseconds
    fn session_timeout_ms(self, timeout_ms: u64) -> Self;

    /// Retry policy consulted between connection attempts
    fn retry_policy(self, policy: Arc<dyn RetryPolicy>) -> Self;

    /// Codec applied to node payloads
    fn compression_provider(self, provider: Arc<dyn CompressionProvider>) -> Self;

    /// Ensemble connect string
    fn connect_string(self, connect_string: impl Into<String>) -> Self;

    /// Allow operating against a read-only member
    fn can_be_read_only(self, read_only: bool) -> Self;

    /// Namespace prefix (empty for none)
    fn namespace(self, namespace: impl Into<String>) -> Self;

    /// Materialize the client
    fn build(self) -> Result<Self::Client>;
}

/// Connection handle produced by a [`ClientBuilder`]
#[async_trait]
pub trait CoordinationClient: Send + Sync + 'static {
    /// Open the connection; must not block until connected
    async fn start(&self) -> Result<()>;

    /// Close the connection and release resources
    async fn close(&self) -> Result<()>;

    /// Current connection state
    fn state(&self) -> ConnectionState;

    /// Returns true if the client currently holds a live connection
    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Namespace applied to operations, if any
    fn namespace(&self) -> Option<&str>;
}

/// Options accumulated by a builder
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connection_timeout_ms: u64,
    pub session_timeout_ms: u64,
    pub retry_policy: Arc<dyn RetryPolicy>,
    pub compression_provider: Arc<dyn CompressionProvider>,
    pub connect_string: Option<String>,
    pub can_be_read_only: bool,
    pub namespace: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        let config = ConnectionConfig::default();
        Self {
            connection_timeout_ms: to_millis(config.connection_timeout),
            session_timeout_ms: to_millis(config.session_timeout),
            retry_policy: config.retry_policy,
            compression_provider: config.compression_provider,
            connect_string: None,
            can_be_read_only: config.read_only,
            namespace: None,
        }
    }
}

impl ClientOptions {
    /// Connect string, failing if none was set
    pub fn require_connect_string(&self) -> Result<&str> {
        self.connect_string
            .as_deref()
            .ok_or(Error::Precondition {
                argument: "connect_string",
            })
    }
}

/// Builder for [`EnsembleClient`]
#[derive(Debug, Clone, Default)]
pub struct EnsembleClientBuilder {
    options: ClientOptions,
}

impl EnsembleClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options set so far
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

impl ClientBuilder for EnsembleClientBuilder {
    type Client = EnsembleClient;

    fn connection_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options.connection_timeout_ms = timeout_ms;
        self
    }

    fn session_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options.session_timeout_ms = timeout_ms;
        self
    }

    fn retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.options.retry_policy = policy;
        self
    }

    fn compression_provider(mut self, provider: Arc<dyn CompressionProvider>) -> Self {
        self.options.compression_provider = provider;
        self
    }

    fn connect_string(mut self, connect_string: impl Into<String>) -> Self {
        self.options.connect_string = Some(connect_string.into());
        self
    }

    fn can_be_read_only(mut self, read_only: bool) -> Self {
        self.options.can_be_read_only = read_only;
        self
    }

    fn namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.options.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    fn build(self) -> Result<EnsembleClient> {
        EnsembleClient::new(self.options)
    }
}
