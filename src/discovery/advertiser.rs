//! Advertises the relay's sockets through a registry

use super::{RegistrationHandle, ServiceEndpoint, ServiceRegistry, ServiceRole};
use crate::config::DiscoveryConfig;
use crate::error::Result;
use log::{info, warn};
use std::collections::BTreeMap;
use uuid::Uuid;

pub struct ServiceAdvertiser {
    registry: Box<dyn ServiceRegistry>,
    service_type: String,
    machine_uuid: String,
    instance: Uuid,
    service_name: String,
    host: String,
    endpoints: Vec<ServiceEndpoint>,
    handles: Vec<RegistrationHandle>,
}

impl ServiceAdvertiser {
    /// `service_name` and `host` go into record names only
    pub fn new(
        registry: Box<dyn ServiceRegistry>,
        config: &DiscoveryConfig,
        service_name: &str,
        host: &str,
    ) -> Self {
        Self {
            registry,
            service_type: config.service_type.clone(),
            machine_uuid: config.uuid.clone(),
            instance: Uuid::new_v4(),
            service_name: service_name.to_string(),
            host: host.to_string(),
            endpoints: Vec::new(),
            handles: Vec::new(),
        }
    }

    /// Per-process id shared by every record
    pub fn instance_id(&self) -> Uuid {
        self.instance
    }

    pub fn endpoints(&self) -> &[ServiceEndpoint] {
        &self.endpoints
    }

    pub fn is_registered(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Describe one bound socket; `dsn` is the URI clients connect to
    pub fn add_endpoint(&mut self, role: ServiceRole, port: u16, dsn: &str) {
        let mut txt = BTreeMap::new();
        txt.insert("dsn".to_string(), dsn.to_string());
        txt.insert("uuid".to_string(), self.machine_uuid.clone());
        txt.insert("service".to_string(), role.as_str().to_string());
        txt.insert("instance".to_string(), self.instance.to_string());

        self.endpoints.push(ServiceEndpoint {
            name: format!(
                "{} {} service on {} pid {}",
                self.service_name,
                role.title(),
                self.host,
                std::process::id()
            ),
            role,
            service_type: self.service_type.clone(),
            subtype: format!("_{}._sub.{}", role.as_str(), self.service_type),
            port,
            txt,
        });
    }

    /// Register every endpoint
    ///
    /// All or nothing: on failure the records registered so far are removed
    /// again before the error is returned.
    pub fn register_all(&mut self) -> Result<()> {
        let mut failure = None;
        for endpoint in &self.endpoints {
            match self.registry.register(endpoint) {
                Ok(handle) => {
                    info!(
                        "Registered {} ({} port {})",
                        endpoint.name, endpoint.subtype, endpoint.port
                    );
                    self.handles.push(handle);
                }
                Err(e) => {
                    warn!("Registering {} failed: {}", endpoint.name, e);
                    failure = Some(e);
                    break;
                }
            }
        }
        match failure {
            Some(e) => {
                self.unregister_all();
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Keep the records alive; a failure withdraws all of them
    pub fn refresh(&mut self) -> Result<()> {
        if self.handles.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.registry.refresh() {
            warn!("Registry refresh failed: {}", e);
            self.unregister_all();
            return Err(e);
        }
        Ok(())
    }

    /// Withdraw every registered record; safe to call more than once
    pub fn unregister_all(&mut self) {
        for handle in self.handles.drain(..) {
            if let Err(e) = self.registry.unregister(handle) {
                warn!("Unregister failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::MemoryRegistry;

    fn advertiser(registry: &MemoryRegistry) -> ServiceAdvertiser {
        let mut advertiser = ServiceAdvertiser::new(
            Box::new(registry.clone()),
            &DiscoveryConfig::default(),
            "Machinekit",
            "localhost",
        );
        advertiser.add_endpoint(ServiceRole::Status, 6001, "tcp://localhost:6001");
        advertiser.add_endpoint(ServiceRole::Error, 6002, "tcp://localhost:6002");
        advertiser.add_endpoint(ServiceRole::Command, 6003, "tcp://localhost:6003");
        advertiser
    }

    #[test]
    fn test_three_records_share_instance() {
        let registry = MemoryRegistry::new();
        let mut advertiser = advertiser(&registry);
        advertiser.register_all().unwrap();

        let records = registry.records();
        assert_eq!(records.len(), 3);
        let instance = advertiser.instance_id().to_string();
        for record in &records {
            assert_eq!(record.instance(), Some(instance.as_str()));
            assert_eq!(record.service_type, "_machinekit._tcp");
            assert_eq!(
                record.txt.get("uuid").map(String::as_str),
                Some("a42c8c6b-4025-4f83-ba28-dad21114744a")
            );
            assert_eq!(
                record.subtype,
                format!("_{}._sub._machinekit._tcp", record.role)
            );
            assert_eq!(
                record.dsn(),
                Some(format!("tcp://localhost:{}", record.port).as_str())
            );
        }
    }

    #[test]
    fn test_unregister_all_is_idempotent() {
        let registry = MemoryRegistry::new();
        let mut advertiser = advertiser(&registry);
        advertiser.register_all().unwrap();
        advertiser.unregister_all();
        advertiser.unregister_all();
        assert!(registry.is_empty());
        assert!(!advertiser.is_registered());
    }

    #[test]
    fn test_register_failure_leaves_nothing() {
        let registry = MemoryRegistry::new();
        registry.set_failing(true);
        let mut advertiser = advertiser(&registry);
        assert!(advertiser.register_all().is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_refresh_failure_withdraws_records() {
        let registry = MemoryRegistry::new();
        let mut advertiser = advertiser(&registry);
        advertiser.register_all().unwrap();
        advertiser.refresh().unwrap();

        registry.set_failing(true);
        assert!(advertiser.refresh().is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_instances_differ_between_advertisers() {
        let registry = MemoryRegistry::new();
        assert_ne!(
            advertiser(&registry).instance_id(),
            advertiser(&registry).instance_id()
        );
    }
}
