//! Service discovery
//!
//! The relay advertises one record per socket so clients can find the status,
//! error and command channels without configuration:
//!
//! | Role | Subtype | TXT |
//! |------|---------|-----|
//! | status | `_status._sub.<type>` | dsn, uuid, service, instance |
//! | error | `_error._sub.<type>` | dsn, uuid, service, instance |
//! | command | `_command._sub.<type>` | dsn, uuid, service, instance |
//!
//! `uuid` identifies the machine and comes from configuration. `instance`
//! is generated per process, so clients can tell a restarted relay apart.
//! Records go through a [`ServiceRegistry`]: [`MemoryRegistry`] keeps them
//! in-process, [`UdpAnnouncer`] broadcasts JSON announcements.

mod advertiser;
mod memory;
mod udp;

pub use advertiser::ServiceAdvertiser;
pub use memory::MemoryRegistry;
pub use udp::{Announcement, UdpAnnouncer};

use crate::config::{DiscoveryConfig, RegistryKind};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which channel a record advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    Status,
    Error,
    Command,
}

impl ServiceRole {
    pub const ALL: [ServiceRole; 3] = [ServiceRole::Status, ServiceRole::Error, ServiceRole::Command];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceRole::Status => "status",
            ServiceRole::Error => "error",
            ServiceRole::Command => "command",
        }
    }

    fn title(self) -> &'static str {
        match self {
            ServiceRole::Status => "Status",
            ServiceRole::Error => "Error",
            ServiceRole::Command => "Command",
        }
    }
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One advertised record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Human readable instance name
    pub name: String,
    pub role: ServiceRole,
    /// Service family, e.g. `_machinekit._tcp`
    pub service_type: String,
    /// e.g. `_status._sub._machinekit._tcp`
    pub subtype: String,
    pub port: u16,
    pub txt: BTreeMap<String, String>,
}

impl ServiceEndpoint {
    pub fn dsn(&self) -> Option<&str> {
        self.txt.get("dsn").map(String::as_str)
    }

    pub fn instance(&self) -> Option<&str> {
        self.txt.get("instance").map(String::as_str)
    }
}

/// Opaque token returned by [`ServiceRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationHandle(pub u64);

/// Backend that makes records visible to clients
pub trait ServiceRegistry: Send {
    fn register(&mut self, endpoint: &ServiceEndpoint) -> Result<RegistrationHandle>;

    /// Keep registrations alive; called periodically
    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }

    fn unregister(&mut self, handle: RegistrationHandle) -> Result<()>;
}

/// Registry backend selected by configuration
pub fn create_registry(config: &DiscoveryConfig) -> Result<Box<dyn ServiceRegistry>> {
    Ok(match config.registry {
        RegistryKind::Memory => Box::new(MemoryRegistry::new()),
        RegistryKind::Udp => Box::new(UdpAnnouncer::new(&config.announce_address)?),
    })
}
