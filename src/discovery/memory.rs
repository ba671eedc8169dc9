//! In-process registry

use super::{RegistrationHandle, ServiceEndpoint, ServiceRegistry};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default)]
struct Records {
    next_id: u64,
    entries: BTreeMap<RegistrationHandle, ServiceEndpoint>,
    failing: bool,
}

/// Registry kept in memory; clones share the same records
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    inner: Arc<Mutex<Records>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current records in registration order
    pub fn records(&self) -> Vec<ServiceEndpoint> {
        self.inner.lock().entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every later register/refresh call fail
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }
}

impl ServiceRegistry for MemoryRegistry {
    fn register(&mut self, endpoint: &ServiceEndpoint) -> Result<RegistrationHandle> {
        let mut inner = self.inner.lock();
        if inner.failing {
            return Err(Error::Discovery(format!("cannot register {}", endpoint.name)));
        }
        inner.next_id += 1;
        let handle = RegistrationHandle(inner.next_id);
        inner.entries.insert(handle, endpoint.clone());
        Ok(handle)
    }

    fn refresh(&mut self) -> Result<()> {
        if self.inner.lock().failing {
            return Err(Error::Discovery("registry unavailable".to_string()));
        }
        Ok(())
    }

    fn unregister(&mut self, handle: RegistrationHandle) -> Result<()> {
        self.inner
            .lock()
            .entries
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| Error::Discovery(format!("unknown registration {}", handle.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ServiceRole;

    fn endpoint(port: u16) -> ServiceEndpoint {
        ServiceEndpoint {
            name: format!("test {}", port),
            role: ServiceRole::Status,
            service_type: "_test._tcp".to_string(),
            subtype: "_status._sub._test._tcp".to_string(),
            port,
            txt: BTreeMap::new(),
        }
    }

    #[test]
    fn test_clones_share_records() {
        let registry = MemoryRegistry::new();
        let mut writer = registry.clone();
        let handle = writer.register(&endpoint(1)).unwrap();
        writer.register(&endpoint(2)).unwrap();
        assert_eq!(registry.len(), 2);

        writer.unregister(handle).unwrap();
        assert_eq!(registry.records()[0].port, 2);
    }

    #[test]
    fn test_double_unregister_fails() {
        let mut registry = MemoryRegistry::new();
        let handle = registry.register(&endpoint(1)).unwrap();
        registry.unregister(handle).unwrap();
        assert!(registry.unregister(handle).is_err());
    }

    #[test]
    fn test_failing_registry() {
        let mut registry = MemoryRegistry::new();
        registry.set_failing(true);
        assert!(matches!(
            registry.register(&endpoint(1)),
            Err(Error::Discovery(_))
        ));
        assert!(registry.refresh().is_err());
        assert!(registry.is_empty());
    }
}
