//! Request/reply socket for the command channel

use super::connection::{Connection, accept_pending};
use super::wire::encode_message;
use crate::error::{Error, Result};
use log::{debug, info, warn};
use std::net::{SocketAddr, TcpListener};

/// Identifies the client a request came from
pub type ClientId = u64;

/// One inbound command frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub client: ClientId,
    pub payload: Vec<u8>,
}

struct CommandClient {
    id: ClientId,
    conn: Connection,
}

/// Accepts any number of command clients
///
/// Each request is a single-frame message. When a client sends a multipart
/// message (an identity envelope, for instance) only the last frame is used.
pub struct CommandSocket {
    listener: TcpListener,
    local_addr: SocketAddr,
    clients: Vec<CommandClient>,
    next_id: ClientId,
    high_water_mark: usize,
    scratch: Vec<u8>,
}

impl CommandSocket {
    pub fn bind(address: &str, high_water_mark: usize) -> Result<Self> {
        let listener = TcpListener::bind(address).map_err(|source| Error::Bind {
            address: address.to_string(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        info!("command socket bound to {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            clients: Vec::new(),
            next_id: 1,
            high_water_mark,
            scratch: Vec::with_capacity(512),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept new clients and collect their requests
    pub fn poll(&mut self) -> Vec<CommandRequest> {
        for conn in accept_pending(&self.listener, self.high_water_mark, "command") {
            let id = self.next_id;
            self.next_id += 1;
            self.clients.push(CommandClient { id, conn });
        }

        let mut requests = Vec::new();
        self.clients.retain_mut(|client| {
            match client.conn.read_messages() {
                Ok(messages) => {
                    for mut message in messages {
                        if let Some(payload) = message.pop() {
                            requests.push(CommandRequest {
                                client: client.id,
                                payload,
                            });
                        }
                    }
                }
                Err(e) => warn!("command: bad request from {}: {}", client.conn.peer(), e),
            }
            if client.conn.is_closed() {
                debug!("command: client {} disconnected", client.conn.peer());
                false
            } else {
                true
            }
        });
        requests
    }

    /// Queue a reply; false if the client is gone or over its high-water mark
    pub fn reply(&mut self, client: ClientId, payload: &[u8]) -> bool {
        let Some(target) = self.clients.iter_mut().find(|c| c.id == client) else {
            debug!("command: reply to departed client {}", client);
            return false;
        };

        self.scratch.clear();
        if let Err(e) = encode_message(&[payload], &mut self.scratch) {
            warn!("command: reply not sent: {}", e);
            return false;
        }
        target.conn.queue(&self.scratch)
    }

    pub fn flush(&mut self) {
        for client in &mut self.clients {
            if let Err(e) = client.conn.flush() {
                debug!("command: write to {} failed: {}", client.conn.peer(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::wire::FrameReader;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::{Duration, Instant};

    #[test]
    fn test_request_reply() {
        let mut socket = CommandSocket::bind("127.0.0.1:0", 64 * 1024).unwrap();
        let mut client = TcpStream::connect(socket.local_addr()).unwrap();

        let mut out = Vec::new();
        encode_message(&[b"request".as_slice()], &mut out).unwrap();
        client.write_all(&out).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut requests = Vec::new();
        while requests.is_empty() && Instant::now() < deadline {
            requests = socket.poll();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].payload, b"request");

        assert!(socket.reply(requests[0].client, b"reply"));
        socket.flush();

        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut reader = FrameReader::new();
        let mut buf = [0u8; 64];
        let message = loop {
            let n = client.read(&mut buf).unwrap();
            reader.push(&buf[..n]);
            if let Some(message) = reader.next_message().unwrap() {
                break message;
            }
        };
        assert_eq!(message, vec![b"reply".to_vec()]);
    }

    #[test]
    fn test_reply_to_unknown_client() {
        let mut socket = CommandSocket::bind("127.0.0.1:0", 1024).unwrap();
        assert!(!socket.reply(99, b"nobody"));
    }

    #[test]
    fn test_envelope_uses_last_frame() {
        let mut socket = CommandSocket::bind("127.0.0.1:0", 1024).unwrap();
        let mut client = TcpStream::connect(socket.local_addr()).unwrap();

        let mut out = Vec::new();
        encode_message(&[b"identity".as_slice(), b"body".as_slice()], &mut out).unwrap();
        client.write_all(&out).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut requests = Vec::new();
        while requests.is_empty() && Instant::now() < deadline {
            requests = socket.poll();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(requests[0].payload, b"body");
    }
}
