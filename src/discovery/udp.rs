//! UDP announcement registry
//!
//! Each record is sent as one JSON datagram:
//!
//! ```json
//! {"event":"announce","ttl_ms":15000,"service":{"name":"Machinekit Status on localhost", ...}}
//! ```
//!
//! Records are re-announced on every refresh. Unregistering sends a
//! `goodbye` datagram for the record.

use super::{RegistrationHandle, ServiceEndpoint, ServiceRegistry};
use crate::error::{Error, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// Time-to-live announced for each record
const ANNOUNCE_TTL_MS: u64 = 15_000;

/// Datagram body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// `announce` or `goodbye`
    pub event: String,
    pub ttl_ms: u64,
    pub service: ServiceEndpoint,
}

pub struct UdpAnnouncer {
    socket: UdpSocket,
    target: SocketAddr,
    next_id: u64,
    records: BTreeMap<RegistrationHandle, ServiceEndpoint>,
}

impl UdpAnnouncer {
    pub fn new(target: &str) -> Result<Self> {
        let target = target
            .to_socket_addrs()
            .map_err(|e| Error::Discovery(format!("bad announce address {}: {}", target, e)))?
            .next()
            .ok_or_else(|| Error::Discovery(format!("no address for {}", target)))?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(true)?;
        info!("Announcing services to {}", target);
        Ok(Self {
            socket,
            target,
            next_id: 0,
            records: BTreeMap::new(),
        })
    }

    fn send(&self, event: &str, endpoint: &ServiceEndpoint) -> Result<()> {
        let announcement = Announcement {
            event: event.to_string(),
            ttl_ms: if event == "goodbye" { 0 } else { ANNOUNCE_TTL_MS },
            service: endpoint.clone(),
        };
        let body = serde_json::to_vec(&announcement)
            .map_err(|e| Error::Discovery(format!("encode announcement: {}", e)))?;
        self.socket
            .send_to(&body, self.target)
            .map_err(|e| Error::Discovery(format!("send to {}: {}", self.target, e)))?;
        debug!("{} {} ({} bytes)", event, endpoint.name, body.len());
        Ok(())
    }
}

impl ServiceRegistry for UdpAnnouncer {
    fn register(&mut self, endpoint: &ServiceEndpoint) -> Result<RegistrationHandle> {
        self.send("announce", endpoint)?;
        self.next_id += 1;
        let handle = RegistrationHandle(self.next_id);
        self.records.insert(handle, endpoint.clone());
        Ok(handle)
    }

    fn refresh(&mut self) -> Result<()> {
        for endpoint in self.records.values() {
            self.send("announce", endpoint)?;
        }
        Ok(())
    }

    fn unregister(&mut self, handle: RegistrationHandle) -> Result<()> {
        let endpoint = self
            .records
            .remove(&handle)
            .ok_or_else(|| Error::Discovery(format!("unknown registration {}", handle.0)))?;
        self.send("goodbye", &endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ServiceRole;
    use std::time::Duration;

    fn listener() -> (UdpSocket, String) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let addr = socket.local_addr().unwrap().to_string();
        (socket, addr)
    }

    fn receive(socket: &UdpSocket) -> Announcement {
        let mut buf = [0u8; 4096];
        let (n, _) = socket.recv_from(&mut buf).unwrap();
        serde_json::from_slice(&buf[..n]).unwrap()
    }

    fn endpoint() -> ServiceEndpoint {
        let mut txt = BTreeMap::new();
        txt.insert("dsn".to_string(), "tcp://127.0.0.1:5000".to_string());
        ServiceEndpoint {
            name: "Test Status on localhost".to_string(),
            role: ServiceRole::Status,
            service_type: "_machinekit._tcp".to_string(),
            subtype: "_status._sub._machinekit._tcp".to_string(),
            port: 5000,
            txt,
        }
    }

    #[test]
    fn test_announce_refresh_goodbye() {
        let (socket, addr) = listener();
        let mut announcer = UdpAnnouncer::new(&addr).unwrap();

        let handle = announcer.register(&endpoint()).unwrap();
        let first = receive(&socket);
        assert_eq!(first.event, "announce");
        assert_eq!(first.service, endpoint());
        assert_eq!(first.service.dsn(), Some("tcp://127.0.0.1:5000"));

        announcer.refresh().unwrap();
        assert_eq!(receive(&socket).event, "announce");

        announcer.unregister(handle).unwrap();
        let bye = receive(&socket);
        assert_eq!(bye.event, "goodbye");
        assert_eq!(bye.ttl_ms, 0);
    }

    #[test]
    fn test_bad_address() {
        assert!(matches!(
            UdpAnnouncer::new("not an address"),
            Err(Error::Discovery(_))
        ));
    }
}
