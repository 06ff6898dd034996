//! Host environment handed to component factories

use std::sync::Arc;

use crate::health::{HealthCheckRegistry, HealthRegistry};
use crate::lifecycle::{Lifecycle, LifecycleManager};

/// Lifecycle and health capabilities of the host
#[derive(Clone)]
pub struct Environment {
    lifecycle: Arc<dyn Lifecycle>,
    health: Arc<dyn HealthRegistry>,
}

impl Environment {
    pub fn new(lifecycle: Arc<dyn Lifecycle>, health: Arc<dyn HealthRegistry>) -> Self {
        Self { lifecycle, health }
    }

    /// Environment backed by the in-process registries
    ///
    /// The concrete registries are returned alongside so the host can drive
    /// start/stop and run health checks.
    pub fn standalone() -> (Self, Arc<LifecycleManager>, Arc<HealthCheckRegistry>) {
        let lifecycle = Arc::new(LifecycleManager::new());
        let health = Arc::new(HealthCheckRegistry::new());
        let environment = Self::new(lifecycle.clone(), health.clone());
        (environment, lifecycle, health)
    }

    pub fn lifecycle(&self) -> &Arc<dyn Lifecycle> {
        &self.lifecycle
    }

    pub fn health(&self) -> &Arc<dyn HealthRegistry> {
        &self.health
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthCheck, HealthCheckResult};

    struct AlwaysHealthy;

    impl HealthCheck for AlwaysHealthy {
        fn check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy()
        }
    }

    #[test]
    fn test_standalone_shares_registries() {
        let (environment, lifecycle, health) = Environment::standalone();

        environment
            .health()
            .register("always", Arc::new(AlwaysHealthy))
            .unwrap();

        assert_eq!(health.names(), vec!["always"]);
        assert_eq!(lifecycle.managed_count(), 0);
    }
}
