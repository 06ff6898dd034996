//! Managed component lifecycle
//!
//! Components start in registration order and stop in reverse order.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use ensemble_core::{Error, Result};

/// A component started and stopped with the host
#[async_trait]
pub trait Managed: Send + Sync {
    /// Acquire resources
    async fn start(&self) -> Result<()>;

    /// Release resources
    async fn stop(&self) -> Result<()>;

    /// Name used in logs
    fn name(&self) -> &str {
        "managed"
    }
}

/// Capability to register managed components
pub trait Lifecycle: Send + Sync {
    /// Register a component for start/stop
    fn manage(&self, component: Arc<dyn Managed>) -> Result<()>;
}

/// In-process lifecycle manager
#[derive(Default)]
pub struct LifecycleManager {
    components: Mutex<Vec<Arc<dyn Managed>>>,
    started: AtomicBool,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered components
    pub fn managed_count(&self) -> usize {
        self.components.lock().len()
    }

    /// Returns true between `start_all` and `stop_all`
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Start every component in registration order
    ///
    /// If a component fails, the ones already started are stopped in
    /// reverse order and the failure is returned.
    pub async fn start_all(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::Lifecycle {
                component: "lifecycle".to_string(),
                message: "already started".to_string(),
            });
        }

        let components = self.components.lock().clone();
        info!(count = components.len(), "Starting managed components");

        for (idx, component) in components.iter().enumerate() {
            if let Err(e) = component.start().await {
                error!(component = component.name(), error = %e, "Failed to start component");

                for started in components[..idx].iter().rev() {
                    if let Err(stop_err) = started.stop().await {
                        warn!(component = started.name(), error = %stop_err, "Rollback stop failed");
                    }
                }

                self.started.store(false, Ordering::SeqCst);
                return Err(e);
            }
        }

        Ok(())
    }

    /// Stop every component in reverse registration order
    ///
    /// Every component is attempted; the first failure is returned.
    pub async fn stop_all(&self) -> Result<()> {
        if !self.started.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let components = self.components.lock().clone();
        info!(count = components.len(), "Stopping managed components");

        let mut first_error = None;
        for component in components.iter().rev() {
            if let Err(e) = component.stop().await {
                error!(component = component.name(), error = %e, "Failed to stop component");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Lifecycle for LifecycleManager {
    fn manage(&self, component: Arc<dyn Managed>) -> Result<()> {
        if self.is_started() {
            return Err(Error::Lifecycle {
                component: component.name().to_string(),
                message: "cannot manage a component after start".to_string(),
            });
        }

        info!(component = component.name(), "Managing component");
        self.components.lock().push(component);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records start/stop calls into a shared journal
    struct Probe {
        name: String,
        journal: Arc<Mutex<Vec<String>>>,
        fail_start: bool,
    }

    impl Probe {
        fn new(name: &str, journal: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                journal: Arc::clone(journal),
                fail_start: false,
            })
        }

        fn failing(name: &str, journal: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                journal: Arc::clone(journal),
                fail_start: true,
            })
        }
    }

    #[async_trait]
    impl Managed for Probe {
        async fn start(&self) -> Result<()> {
            if self.fail_start {
                return Err(Error::Internal {
                    message: format!("{} refused to start", self.name),
                });
            }
            self.journal.lock().push(format!("start:{}", self.name));
            Ok(())
        }

        async fn stop(&self) -> Result<()> {
            self.journal.lock().push(format!("stop:{}", self.name));
            Ok(())
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    #[tokio::test]
    async fn test_start_in_order_stop_in_reverse() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let manager = LifecycleManager::new();
        manager.manage(Probe::new("a", &journal)).unwrap();
        manager.manage(Probe::new("b", &journal)).unwrap();
        assert_eq!(manager.managed_count(), 2);

        manager.start_all().await.unwrap();
        assert!(manager.is_started());
        manager.stop_all().await.unwrap();
        assert!(!manager.is_started());

        assert_eq!(
            *journal.lock(),
            vec!["start:a", "start:b", "stop:b", "stop:a"]
        );
    }

    #[tokio::test]
    async fn test_start_failure_rolls_back() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let manager = LifecycleManager::new();
        manager.manage(Probe::new("a", &journal)).unwrap();
        manager.manage(Probe::new("b", &journal)).unwrap();
        manager.manage(Probe::failing("c", &journal)).unwrap();

        let err = manager.start_all().await.unwrap_err();
        assert!(matches!(err, Error::Internal { .. }));
        assert!(!manager.is_started());
        assert_eq!(
            *journal.lock(),
            vec!["start:a", "start:b", "stop:b", "stop:a"]
        );
    }

    #[tokio::test]
    async fn test_manage_after_start_rejected() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let manager = LifecycleManager::new();
        manager.start_all().await.unwrap();

        let result = manager.manage(Probe::new("late", &journal));
        assert!(matches!(result, Err(Error::Lifecycle { .. })));
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let manager = LifecycleManager::new();
        manager.manage(Probe::new("a", &journal)).unwrap();

        manager.stop_all().await.unwrap();
        assert!(journal.lock().is_empty());
    }
}
