//! Client side of the status, error and command channels
//!
//! - [`StatusSubscriber`]: connect to a publish socket, subscribe, receive
//!   `(topic, Container)` pairs
//! - [`StatusMirror`]: rebuild a [`StateSnapshot`] from full and
//!   incremental updates
//! - [`CommandClient`]: send command requests and read replies
//!
//! Used by the `status-monitor` binary and the integration tests.

use crate::diff::merge_group;
use crate::error::{Error, Result};
use crate::model::{
    ConfigStatus, Group, InterpStatus, IoStatus, MotionStatus, StateSnapshot, TaskStatus,
};
use crate::proto::{Container, MessageType, codec};
use crate::streaming::wire::encode_message;
use crate::streaming::{FrameReader, SubscriptionFrame};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// Snapshot maintained from received status updates
#[derive(Debug, Clone, Default)]
pub struct StatusMirror {
    snapshot: StateSnapshot,
    keepalive_ms: Option<i32>,
    updates: u64,
}

impl StatusMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    /// Keepalive interval announced by the last full update
    pub fn keepalive_ms(&self) -> Option<i32> {
        self.keepalive_ms
    }

    /// Status updates applied so far
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Apply one status-channel message; returns the group it changed
    ///
    /// A full update replaces the group. Pings and other message types
    /// leave the snapshot alone.
    pub fn apply(&mut self, message: &Container) -> Option<Group> {
        let delta = message.delta.as_ref()?;
        match message.message_type()? {
            MessageType::FullUpdate => {
                self.reset(delta.group());
                if let Some(pparams) = &message.pparams {
                    self.keepalive_ms = Some(pparams.keepalive_timer);
                }
            }
            MessageType::IncrementalUpdate => {}
            _ => return None,
        }
        merge_group(&mut self.snapshot, delta);
        self.updates += 1;
        Some(delta.group())
    }

    fn reset(&mut self, group: Group) {
        match group {
            Group::Config => self.snapshot.config = ConfigStatus::default(),
            Group::Io => self.snapshot.io = IoStatus::default(),
            Group::Task => self.snapshot.task = TaskStatus::default(),
            Group::Interp => self.snapshot.interp = InterpStatus::default(),
            Group::Motion => self.snapshot.motion = MotionStatus::default(),
        }
    }
}

fn read_message(
    stream: &mut TcpStream,
    reader: &mut FrameReader,
    timeout: Duration,
) -> Result<Option<Vec<Vec<u8>>>> {
    let deadline = Instant::now() + timeout;
    let mut buf = [0u8; 8192];
    loop {
        if let Some(message) = reader.next_message()? {
            return Ok(Some(message));
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        stream.set_read_timeout(Some(remaining))?;
        match stream.read(&mut buf) {
            Ok(0) => return Err(Error::ConnectionClosed),
            Ok(n) => reader.push(&buf[..n]),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Subscriber connection to a status or error socket
pub struct StatusSubscriber {
    stream: TcpStream,
    reader: FrameReader,
}

impl StatusSubscriber {
    pub fn connect<A: ToSocketAddrs>(address: A) -> Result<Self> {
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            reader: FrameReader::new(),
        })
    }

    /// Connect using a `tcp://host:port` dsn
    pub fn connect_dsn(dsn: &str) -> Result<Self> {
        Self::connect(strip_scheme(dsn)?)
    }

    fn send_frame(&mut self, frame: SubscriptionFrame) -> Result<()> {
        let mut out = Vec::new();
        encode_message(&[frame.to_bytes().as_slice()], &mut out)?;
        self.stream.write_all(&out)?;
        Ok(())
    }

    pub fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.send_frame(SubscriptionFrame::Subscribe(topic.to_string()))
    }

    pub fn unsubscribe(&mut self, topic: &str) -> Result<()> {
        self.send_frame(SubscriptionFrame::Unsubscribe(topic.to_string()))
    }

    /// Next `(topic, message)`, or `None` when `timeout` passes first
    pub fn recv(&mut self, timeout: Duration) -> Result<Option<(String, Container)>> {
        let Some(mut parts) = read_message(&mut self.stream, &mut self.reader, timeout)? else {
            return Ok(None);
        };
        if parts.len() != 2 {
            return Err(Error::InvalidFrame(format!(
                "expected topic and payload, got {} frames",
                parts.len()
            )));
        }
        let payload = parts.pop().unwrap_or_default();
        let topic = String::from_utf8_lossy(&parts[0]).into_owned();
        Ok(Some((topic, codec::decode(&payload)?)))
    }
}

/// Request/reply connection to the command socket
pub struct CommandClient {
    stream: TcpStream,
    reader: FrameReader,
}

impl CommandClient {
    pub fn connect<A: ToSocketAddrs>(address: A) -> Result<Self> {
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            reader: FrameReader::new(),
        })
    }

    pub fn connect_dsn(dsn: &str) -> Result<Self> {
        Self::connect(strip_scheme(dsn)?)
    }

    pub fn send(&mut self, request: &Container) -> Result<()> {
        let payload = codec::encode(request);
        let mut out = Vec::new();
        encode_message(&[payload.as_slice()], &mut out)?;
        self.stream.write_all(&out)?;
        Ok(())
    }

    /// Next reply, or `None` on timeout
    pub fn recv(&mut self, timeout: Duration) -> Result<Option<Container>> {
        match read_message(&mut self.stream, &mut self.reader, timeout)? {
            Some(mut parts) => {
                let payload = parts.pop().unwrap_or_default();
                Ok(Some(codec::decode(&payload)?))
            }
            None => Ok(None),
        }
    }

    /// Send a ping and wait for the acknowledge
    pub fn ping(&mut self, timeout: Duration) -> Result<bool> {
        self.send(&codec::ping(None))?;
        Ok(self
            .recv(timeout)?
            .is_some_and(|reply| reply.message_type() == Some(MessageType::PingAcknowledge)))
    }
}

fn strip_scheme(dsn: &str) -> Result<&str> {
    dsn.strip_prefix("tcp://")
        .ok_or_else(|| Error::Other(format!("unsupported dsn {}", dsn)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffEngine;
    use crate::model::MotionAxis;

    #[test]
    fn test_mirror_follows_updates() {
        let mut engine = DiffEngine::new();
        let mut mirror = StatusMirror::new();
        let mut state = StateSnapshot::default();

        state.config.axes = 3;
        state.motion.axis.push(MotionAxis {
            enabled: true,
            ..Default::default()
        });
        for delta in engine.diff(&state) {
            let message = codec::status_update(MessageType::IncrementalUpdate, delta, None);
            assert!(mirror.apply(&message).is_some());
        }
        assert_eq!(mirror.snapshot(), engine.baseline());
        assert_eq!(mirror.updates(), 2);
    }

    #[test]
    fn test_full_update_replaces_group() {
        let mut mirror = StatusMirror::new();
        let mut stale = StateSnapshot::default();
        stale.io.flood = true;
        stale.io.lube_level = 2;
        let mut engine = DiffEngine::new();
        for delta in engine.diff(&stale) {
            mirror.apply(&codec::status_update(MessageType::IncrementalUpdate, delta, None));
        }

        let mut fresh_engine = DiffEngine::new();
        let mut fresh = StateSnapshot::default();
        fresh.io.mist = true;
        fresh_engine.diff(&fresh);
        let full = codec::status_update(
            MessageType::FullUpdate,
            fresh_engine.full_update(Group::Io),
            Some(1500),
        );
        assert_eq!(mirror.apply(&full), Some(Group::Io));
        assert!(!mirror.snapshot().io.flood);
        assert!(mirror.snapshot().io.mist);
        assert_eq!(mirror.keepalive_ms(), Some(1500));
    }

    #[test]
    fn test_ping_is_ignored() {
        let mut mirror = StatusMirror::new();
        assert_eq!(mirror.apply(&codec::ping(Some(100))), None);
        assert_eq!(mirror.updates(), 0);
    }

    #[test]
    fn test_strip_scheme() {
        assert_eq!(strip_scheme("tcp://127.0.0.1:5000").unwrap(), "127.0.0.1:5000");
        assert!(strip_scheme("ipc:///tmp/x").is_err());
    }
}
