//! Lifecycle registration for a client handle

use async_trait::async_trait;
use std::sync::Arc;

use ensemble_client::CoordinationClient;
use ensemble_core::Result;
use host::Managed;

/// Starts the client with the host and closes it on shutdown
pub struct ManagedClient<C> {
    client: Arc<C>,
}

impl<C: CoordinationClient> ManagedClient<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: CoordinationClient> Managed for ManagedClient<C> {
    async fn start(&self) -> Result<()> {
        self.client.start().await
    }

    async fn stop(&self) -> Result<()> {
        self.client.close().await
    }

    fn name(&self) -> &str {
        "ensemble-client"
    }
}
