//! Connectivity health probe

use std::sync::Arc;

use ensemble_client::CoordinationClient;
use host::{HealthCheck, HealthCheckResult};

/// Healthy while the client holds a live connection
pub struct ClientHealthCheck<C> {
    client: Arc<C>,
}

impl<C: CoordinationClient> ClientHealthCheck<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

impl<C: CoordinationClient> HealthCheck for ClientHealthCheck<C> {
    fn check(&self) -> HealthCheckResult {
        if self.client.is_connected() {
            HealthCheckResult::healthy()
        } else {
            HealthCheckResult::unhealthy(format!(
                "Client not connected (state {})",
                self.client.state()
            ))
        }
    }
}
