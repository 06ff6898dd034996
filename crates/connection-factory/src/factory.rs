//! Connection factory
//!
//! Translates a [`ConnectionConfig`] into a client handle, then registers the
//! handle with the host lifecycle and health registry before returning it.
//! The factory holds no state between `build` calls.

use std::sync::Arc;

use tracing::{debug, info};

use ensemble_client::{ClientBuilder, EnsembleClientBuilder};
use ensemble_core::config::to_millis;
use ensemble_core::{ConnectionConfig, Error, Result};
use host::Environment;

use crate::health::ClientHealthCheck;
use crate::managed::ManagedClient;

/// Name the connectivity probe is registered under
pub const HEALTH_CHECK_NAME: &str = "curator";

/// Builds registered client handles
pub struct ConnectionFactory<B = EnsembleClientBuilder> {
    environment: Environment,
    new_builder: Arc<dyn Fn() -> B + Send + Sync>,
}

impl ConnectionFactory<EnsembleClientBuilder> {
    /// Create a factory producing [`ensemble_client::EnsembleClient`] handles
    pub fn new(environment: Environment) -> Self {
        Self::with_builder(environment, EnsembleClientBuilder::new)
    }

    /// Like [`ConnectionFactory::new`], failing fast when no environment is given
    pub fn try_new(environment: Option<Environment>) -> Result<Self> {
        Self::try_with_builder(environment, EnsembleClientBuilder::new)
    }
}

impl<B: ClientBuilder> ConnectionFactory<B> {
    /// Create a factory that obtains a fresh builder from `new_builder` per build
    pub fn with_builder<F>(environment: Environment, new_builder: F) -> Self
    where
        F: Fn() -> B + Send + Sync + 'static,
    {
        Self {
            environment,
            new_builder: Arc::new(new_builder),
        }
    }

    /// Like [`ConnectionFactory::with_builder`], failing fast when no environment is given
    pub fn try_with_builder<F>(environment: Option<Environment>, new_builder: F) -> Result<Self>
    where
        F: Fn() -> B + Send + Sync + 'static,
    {
        let environment = environment.ok_or(Error::Precondition {
            argument: "environment",
        })?;
        Ok(Self::with_builder(environment, new_builder))
    }

    /// Build a handle and register it under the `curator` health check
    pub fn build(&self, config: &ConnectionConfig) -> Result<Arc<B::Client>> {
        self.build_named(config, HEALTH_CHECK_NAME)
    }

    /// Like [`ConnectionFactory::build`], failing fast when no config is given
    pub fn try_build(&self, config: Option<&ConnectionConfig>) -> Result<Arc<B::Client>> {
        let config = config.ok_or(Error::Precondition { argument: "config" })?;
        self.build(config)
    }

    /// Build a handle and register its health check under `name`
    ///
    /// The handle is managed before its health check is registered. If
    /// registration fails (for example a taken `name`), the lifecycle still
    /// holds the handle and will start and close it, but the caller never
    /// receives it. Hosts treat that error as a startup failure.
    pub fn build_named(&self, config: &ConnectionConfig, name: &str) -> Result<Arc<B::Client>> {
        debug!(
            ensemble = %config.ensemble,
            connection_timeout_ms = to_millis(config.connection_timeout),
            session_timeout_ms = to_millis(config.session_timeout),
            read_only = config.read_only,
            namespace = %config.namespace,
            "Building ensemble client"
        );

        let client = Arc::new(
            (self.new_builder)()
                .connection_timeout_ms(to_millis(config.connection_timeout))
                .session_timeout_ms(to_millis(config.session_timeout))
                .retry_policy(Arc::clone(&config.retry_policy))
                .compression_provider(Arc::clone(&config.compression_provider))
                .connect_string(config.ensemble.clone())
                .can_be_read_only(config.read_only)
                .namespace(config.namespace.clone())
                .build()?,
        );

        self.environment
            .lifecycle()
            .manage(Arc::new(ManagedClient::new(Arc::clone(&client))))?;
        self.environment
            .health()
            .register(name, Arc::new(ClientHealthCheck::new(Arc::clone(&client))))?;

        info!(ensemble = %config.ensemble, health_check = name, "Ensemble client registered");
        Ok(client)
    }
}
