//! Configuration for the status relay daemon
//!
//! Loaded from a TOML file. Every section and every key is optional; missing
//! values fall back to the defaults below.
//!
//! ```toml
//! [service]
//! name = "Machinekit"
//! loopback = false
//! poll_interval_ms = 100
//! ping_interval_ms = 2000
//!
//! [discovery]
//! enabled = true
//! registry = "udp"
//! uuid = "a42c8c6b-4025-4f83-ba28-dad21114744a"
//!
//! [machine]
//! axes = 3
//! tools = 4
//!
//! [logging]
//! level = "info"
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub machine: MachineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Socket and cadence settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Machine name used in advertised service names
    pub name: String,
    /// Bind to 127.0.0.1 instead of all interfaces
    pub loopback: bool,
    /// Host placed in advertised dsn URIs
    pub advertise_host: String,
    /// Poll Loop period
    pub poll_interval_ms: u64,
    /// Keepalive ping period on subscribed topics (0 disables pings)
    pub ping_interval_ms: u64,
    /// Per-peer outbound buffer limit in bytes
    pub send_high_water_mark: usize,
    /// Capacity of the command dispatcher queue
    pub command_queue: usize,
    /// Commands running longer than this are reported
    pub command_timeout_ms: u64,
    /// Capacity of each event bus listener queue
    pub event_queue: usize,
    /// Router wait between socket sweeps
    pub router_tick_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "Machinekit".to_string(),
            loopback: false,
            advertise_host: "localhost".to_string(),
            poll_interval_ms: 100,
            ping_interval_ms: 2000,
            send_high_water_mark: 1024 * 1024,
            command_queue: 64,
            command_timeout_ms: 5000,
            event_queue: 1024,
            router_tick_ms: 5,
        }
    }
}

impl ServiceConfig {
    /// Address the three listeners bind to, always on an ephemeral port
    pub fn bind_address(&self) -> String {
        if self.loopback {
            "127.0.0.1:0".to_string()
        } else {
            "0.0.0.0:0".to_string()
        }
    }

    /// Host used when building dsn URIs for bound sockets
    pub fn dsn_host(&self) -> &str {
        if self.loopback {
            "127.0.0.1"
        } else {
            &self.advertise_host
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn router_tick(&self) -> Duration {
        Duration::from_millis(self.router_tick_ms.max(1))
    }

    /// Number of poll cycles between keepalive pings, or `None` when disabled
    pub fn ping_ratio(&self) -> Option<u64> {
        if self.ping_interval_ms == 0 {
            return None;
        }
        Some((self.ping_interval_ms / self.poll_interval_ms.max(1)).max(1))
    }
}

/// Which registry backend advertises the endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    /// JSON announcements over UDP broadcast/multicast
    Udp,
    /// In-process registry (tests, embedded use)
    Memory,
}

/// Service discovery settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub enabled: bool,
    pub registry: RegistryKind,
    /// Service family shared by all three records
    pub service_type: String,
    /// Machine UUID placed in every record's `uuid` TXT entry
    pub uuid: String,
    /// Destination for UDP announcements
    pub announce_address: String,
    /// Re-announce period
    pub announce_interval_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            registry: RegistryKind::Udp,
            service_type: "_machinekit._tcp".to_string(),
            uuid: "a42c8c6b-4025-4f83-ba28-dad21114744a".to_string(),
            announce_address: "255.255.255.255:5354".to_string(),
            announce_interval_ms: 5000,
        }
    }
}

impl DiscoveryConfig {
    pub fn announce_interval(&self) -> Duration {
        Duration::from_millis(self.announce_interval_ms.max(100))
    }
}

/// Simulated machine layout
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MachineConfig {
    pub axes: usize,
    pub tools: usize,
    pub digital_io: usize,
    pub analog_io: usize,
    /// Noise seed (0 = random each run)
    pub seed: u64,
    /// Position noise standard deviation in machine units
    pub position_noise: f64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            axes: 3,
            tools: 4,
            digital_io: 4,
            analog_io: 2,
            seed: 0,
            position_noise: 0.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.poll_interval_ms, 100);
        assert_eq!(config.service.ping_interval_ms, 2000);
        assert_eq!(config.discovery.service_type, "_machinekit._tcp");
        assert_eq!(config.discovery.registry, RegistryKind::Udp);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.service.poll_interval_ms, 100);
        assert_eq!(config.machine.axes, 3);
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[service]
loopback = true
poll_interval_ms = 50

[discovery]
registry = "memory"

[machine]
axes = 5
seed = 42

[logging]
level = "debug"
"#;

        let config = Config::from_toml(toml_content).unwrap();
        assert!(config.service.loopback);
        assert_eq!(config.service.poll_interval_ms, 50);
        // Unspecified keys in a present section keep their defaults
        assert_eq!(config.service.ping_interval_ms, 2000);
        assert_eq!(config.discovery.registry, RegistryKind::Memory);
        assert_eq!(config.machine.axes, 5);
        assert_eq!(config.machine.seed, 42);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = Config::from_toml("[service]\npoll_interval_ms = \"fast\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_ping_ratio() {
        let mut service = ServiceConfig::default();
        assert_eq!(service.ping_ratio(), Some(20));
        service.ping_interval_ms = 0;
        assert_eq!(service.ping_ratio(), None);
        service.ping_interval_ms = 10;
        assert_eq!(service.ping_ratio(), Some(1));
    }

    #[test]
    fn test_loopback_bind_address() {
        let mut service = ServiceConfig::default();
        assert_eq!(service.bind_address(), "0.0.0.0:0");
        assert_eq!(service.dsn_host(), "localhost");
        service.loopback = true;
        assert_eq!(service.bind_address(), "127.0.0.1:0");
        assert_eq!(service.dsn_host(), "127.0.0.1");
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");

        let mut config = Config::default();
        config.machine.tools = 7;
        config.to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.machine.tools, 7);
        assert_eq!(loaded.discovery.uuid, config.discovery.uuid);
    }
}
