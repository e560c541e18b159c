//! Service registry
//!
//! Named, construct-once cache of shared service instances. Instances are
//! created lazily through a factory or registered explicitly, handed out as
//! `Arc`s and torn down together by [`ServiceRegistry::cleanup`].

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::utils::errors::{Result, TorahBotError};

/// Lifecycle hook for services held by the registry
#[async_trait]
pub trait ManagedService: Send + Sync + 'static {
    /// Release resources held by the service
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }
}

struct Entry {
    instance: Arc<dyn Any + Send + Sync>,
    managed: Arc<dyn ManagedService>,
}

#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Entry>>,
    creation_lock: Mutex<()>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached instance for `name`, building it with `factory` on
    /// first use. Concurrent first requests result in a single factory call.
    pub async fn get_or_init<T, F, Fut>(&self, name: &str, factory: F) -> Result<Arc<T>>
    where
        T: ManagedService,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(existing) = self.lookup::<T>(name)? {
            return Ok(existing);
        }

        let _guard = self.creation_lock.lock().await;

        // Another caller may have finished creating it while we waited
        if let Some(existing) = self.lookup::<T>(name)? {
            return Ok(existing);
        }

        debug!(service = name, "Creating service");
        let instance = Arc::new(factory().await?);
        self.insert(name, instance.clone());
        info!(service = name, "Service created");

        Ok(instance)
    }

    /// Fetch a registered service
    pub fn get_service<T: ManagedService>(&self, name: &str) -> Result<Arc<T>> {
        self.lookup::<T>(name)?
            .ok_or_else(|| TorahBotError::ServiceNotFound(name.to_string()))
    }

    /// Register an already constructed instance, replacing any previous one
    pub fn register_service<T: ManagedService>(&self, name: &str, instance: Arc<T>) {
        if self.insert(name, instance) {
            warn!(service = name, "Replacing existing service registration");
        } else {
            info!(service = name, "Service registered");
        }
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Names of all registered services, sorted
    pub fn list_services(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Run every service's cleanup hook, then empty the registry.
    ///
    /// Failing hooks are logged and do not stop the others.
    pub async fn cleanup(&self) {
        let entries: Vec<(String, Arc<dyn ManagedService>)> = {
            let mut services = self
                .services
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            services
                .drain()
                .map(|(name, entry)| (name, entry.managed))
                .collect()
        };

        for (name, service) in entries {
            match service.cleanup().await {
                Ok(()) => debug!(service = %name, "Service cleaned up"),
                Err(e) => error!(service = %name, error = %e, "Service cleanup failed"),
            }
        }

        info!("Service registry cleared");
    }

    fn lookup<T: ManagedService>(&self, name: &str) -> Result<Option<Arc<T>>> {
        let services = self
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        match services.get(name) {
            None => Ok(None),
            Some(entry) => entry
                .instance
                .clone()
                .downcast::<T>()
                .map(Some)
                .map_err(|_| TorahBotError::ServiceTypeMismatch {
                    name: name.to_string(),
                }),
        }
    }

    /// Returns true when an existing entry was replaced
    fn insert<T: ManagedService>(&self, name: &str, instance: Arc<T>) -> bool {
        let entry = Entry {
            instance: instance.clone(),
            managed: instance,
        };
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), entry)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct Counter {
        value: usize,
    }

    impl ManagedService for Counter {}

    #[derive(Debug)]
    struct Failing {
        cleaned: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl ManagedService for Failing {
        async fn cleanup(&self) -> Result<()> {
            self.cleaned.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(TorahBotError::Handler("close failed".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_share_one_instance() {
        let registry = Arc::new(ServiceRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .get_or_init("counter", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(Counter { value: 7 })
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut instances = Vec::new();
        for handle in handles {
            instances.push(handle.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
        assert_eq!(instances[0].value, 7);
    }

    #[tokio::test]
    async fn test_factory_error_leaves_registry_empty() {
        let registry = ServiceRegistry::new();
        let result = registry
            .get_or_init::<Counter, _, _>("counter", || async {
                Err(TorahBotError::Config("no database".to_string()))
            })
            .await;

        assert_matches!(result, Err(TorahBotError::Config(_)));
        assert!(!registry.has_service("counter"));
    }

    #[test]
    fn test_get_missing_service() {
        let registry = ServiceRegistry::new();
        assert_matches!(
            registry.get_service::<Counter>("missing"),
            Err(TorahBotError::ServiceNotFound(name)) if name == "missing"
        );
    }

    #[test]
    fn test_get_service_with_wrong_type() {
        let registry = ServiceRegistry::new();
        registry.register_service("counter", Arc::new(Counter { value: 1 }));

        assert_matches!(
            registry.get_service::<Failing>("counter"),
            Err(TorahBotError::ServiceTypeMismatch { .. })
        );
    }

    #[test]
    fn test_register_replaces_existing() {
        let registry = ServiceRegistry::new();
        registry.register_service("counter", Arc::new(Counter { value: 1 }));
        registry.register_service("counter", Arc::new(Counter { value: 2 }));

        assert_eq!(registry.get_service::<Counter>("counter").unwrap().value, 2);
        assert_eq!(registry.list_services(), vec!["counter".to_string()]);
    }

    #[tokio::test]
    async fn test_cleanup_continues_after_failure() {
        let registry = ServiceRegistry::new();
        let cleaned = Arc::new(AtomicUsize::new(0));

        registry.register_service(
            "a",
            Arc::new(Failing {
                cleaned: cleaned.clone(),
                fail: true,
            }),
        );
        registry.register_service(
            "b",
            Arc::new(Failing {
                cleaned: cleaned.clone(),
                fail: false,
            }),
        );

        registry.cleanup().await;

        assert_eq!(cleaned.load(Ordering::SeqCst), 2);
        assert!(registry.list_services().is_empty());
    }
}
