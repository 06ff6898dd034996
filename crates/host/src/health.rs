//! Named health checks

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use ensemble_core::{Error, Result};

/// Outcome of a single health check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Whether the component is operating correctly
    pub healthy: bool,

    /// Optional detail, always set when unhealthy
    pub message: Option<String>,

    /// When the check ran
    pub timestamp: DateTime<Utc>,
}

impl HealthCheckResult {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}

/// On-demand probe of a component's condition
pub trait HealthCheck: Send + Sync {
    fn check(&self) -> HealthCheckResult;
}

/// Capability to register named health checks
pub trait HealthRegistry: Send + Sync {
    /// Register `check` under `name`
    fn register(&self, name: &str, check: Arc<dyn HealthCheck>) -> Result<()>;
}

/// In-process health check registry
///
/// Names are unique; results are reported in name order.
#[derive(Default)]
pub struct HealthCheckRegistry {
    checks: RwLock<BTreeMap<String, Arc<dyn HealthCheck>>>,
}

impl HealthCheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a check, returning whether it existed
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.checks.write().remove(name).is_some();
        if removed {
            info!(name, "Health check unregistered");
        }
        removed
    }

    /// Registered names in order
    pub fn names(&self) -> Vec<String> {
        self.checks.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.checks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.read().is_empty()
    }

    /// Run a single check
    pub fn run_health_check(&self, name: &str) -> Option<HealthCheckResult> {
        let check = self.checks.read().get(name).cloned()?;
        Some(check.check())
    }

    /// Run every check
    pub fn run_health_checks(&self) -> BTreeMap<String, HealthCheckResult> {
        let checks: Vec<_> = self
            .checks
            .read()
            .iter()
            .map(|(name, check)| (name.clone(), Arc::clone(check)))
            .collect();

        checks
            .into_iter()
            .map(|(name, check)| {
                let result = check.check();
                if result.healthy {
                    debug!(name = %name, "Health check passed");
                } else {
                    warn!(name = %name, message = ?result.message, "Health check failed");
                }
                (name, result)
            })
            .collect()
    }
}

impl HealthRegistry for HealthCheckRegistry {
    fn register(&self, name: &str, check: Arc<dyn HealthCheck>) -> Result<()> {
        let mut checks = self.checks.write();
        if checks.contains_key(name) {
            return Err(Error::HealthCheckExists {
                name: name.to_string(),
            });
        }

        checks.insert(name.to_string(), check);
        info!(name, "Health check registered");
        Ok(())
    }
}
