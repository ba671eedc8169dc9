//! Non-blocking peer connection with bounded outbound buffer

use super::wire::FrameReader;
use crate::error::{Error, Result};
use log::{debug, warn};
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

const READ_CHUNK: usize = 8192;
/// Inbound bytes taken from one peer per poll; the rest waits in the kernel
pub const MAX_READ_PER_POLL: usize = 4 * READ_CHUNK;

/// One accepted peer
///
/// Inbound bytes go through a [`FrameReader`]. Outbound messages are queued
/// whole; a message that would push the queue past the high-water mark is
/// dropped for this peer only. Bytes already queued are always written out
/// in full, so a slow peer never sees a truncated frame.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    reader: FrameReader,
    outbox: Vec<u8>,
    high_water_mark: usize,
    dropped: u64,
    closed: bool,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, high_water_mark: usize) -> Result<Self> {
        stream.set_nonblocking(true)?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", peer, e);
        }
        Ok(Self {
            stream,
            peer,
            reader: FrameReader::new(),
            outbox: Vec::new(),
            high_water_mark,
            dropped: 0,
            closed: false,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Whether the peer has closed its side or the stream failed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Read what is available, up to [`MAX_READ_PER_POLL`] bytes, and
    /// return the complete messages
    ///
    /// Messages that were fully received before the peer closed are still
    /// returned; check [`is_closed`](Self::is_closed) afterwards.
    pub fn read_messages(&mut self) -> Result<Vec<Vec<Vec<u8>>>> {
        let mut chunk = [0u8; READ_CHUNK];
        let mut taken = 0;
        while !self.closed && taken < MAX_READ_PER_POLL {
            let want = (MAX_READ_PER_POLL - taken).min(READ_CHUNK);
            match self.stream.read(&mut chunk[..want]) {
                Ok(0) => self.closed = true,
                Ok(n) => {
                    self.reader.push(&chunk[..n]);
                    taken += n;
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.closed = true;
                    debug!("Read error from {}: {}", self.peer, e);
                }
            }
        }

        let mut messages = Vec::new();
        match self.drain_reader(&mut messages) {
            Ok(()) => Ok(messages),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    fn drain_reader(&mut self, messages: &mut Vec<Vec<Vec<u8>>>) -> Result<()> {
        while let Some(message) = self.reader.next_message()? {
            messages.push(message);
        }
        Ok(())
    }

    /// Queue an encoded message; returns false if it was dropped
    pub fn queue(&mut self, encoded: &[u8]) -> bool {
        if !self.outbox.is_empty() && self.outbox.len() + encoded.len() > self.high_water_mark {
            self.dropped += 1;
            if self.dropped == 1 || self.dropped % 100 == 0 {
                warn!(
                    "Peer {} over high-water mark ({} bytes pending), {} messages dropped",
                    self.peer,
                    self.outbox.len(),
                    self.dropped
                );
            }
            return false;
        }
        self.outbox.extend_from_slice(encoded);
        true
    }

    /// Write as much of the outbox as the socket accepts
    pub fn flush(&mut self) -> Result<()> {
        while !self.outbox.is_empty() {
            match self.stream.write(&self.outbox) {
                Ok(0) => {
                    self.closed = true;
                    return Err(Error::ConnectionClosed);
                }
                Ok(n) => {
                    self.outbox.drain(..n);
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.closed = true;
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}

/// Accept every pending connection on a non-blocking listener
pub fn accept_pending(
    listener: &TcpListener,
    high_water_mark: usize,
    name: &str,
) -> Vec<Connection> {
    let mut accepted = Vec::new();
    loop {
        match listener.accept() {
            Ok((stream, addr)) => match Connection::new(stream, addr, high_water_mark) {
                Ok(conn) => {
                    debug!("{}: client connected from {}", name, addr);
                    accepted.push(conn);
                }
                Err(e) => warn!("{}: failed to configure client {}: {}", name, addr, e),
            },
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("{}: accept error: {}", name, e);
                break;
            }
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::wire::encode_message;
    use std::time::{Duration, Instant};

    fn pair(high_water_mark: usize) -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (stream, addr) = listener.accept().unwrap();
        (Connection::new(stream, addr, high_water_mark).unwrap(), client)
    }

    #[test]
    fn test_reads_complete_messages() {
        let (mut conn, mut client) = pair(1024);
        let mut out = Vec::new();
        encode_message(&[b"\x01motion".as_slice()], &mut out).unwrap();
        client.write_all(&out).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut messages = Vec::new();
        while messages.is_empty() && Instant::now() < deadline {
            messages = conn.read_messages().unwrap();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(messages, vec![vec![b"\x01motion".to_vec()]]);
        assert!(!conn.is_closed());
    }

    #[test]
    fn test_reads_are_capped_per_poll() {
        let (mut conn, mut client) = pair(1024);
        // 8-byte messages, twice the per-poll budget
        let frame = {
            let mut out = Vec::new();
            encode_message(&[b"\x01io".as_slice()], &mut out).unwrap();
            out
        };
        let total = 2 * MAX_READ_PER_POLL / frame.len();
        let burst: Vec<u8> = frame.iter().copied().cycle().take(total * frame.len()).collect();
        client.write_all(&burst).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut received = 0;
        let mut polls_with_data = 0;
        while received < total && Instant::now() < deadline {
            let messages = conn.read_messages().unwrap();
            assert!(messages.len() <= MAX_READ_PER_POLL / frame.len());
            if !messages.is_empty() {
                polls_with_data += 1;
            }
            received += messages.len();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(received, total);
        assert!(polls_with_data >= 2);
    }

    #[test]
    fn test_detects_close() {
        let (mut conn, client) = pair(1024);
        drop(client);

        let deadline = Instant::now() + Duration::from_secs(2);
        while !conn.is_closed() && Instant::now() < deadline {
            let _ = conn.read_messages();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(conn.is_closed());
    }

    #[test]
    fn test_high_water_mark_drops_whole_messages() {
        let (mut conn, _client) = pair(10);
        // First message is always accepted even when larger than the mark
        assert!(conn.queue(&[0u8; 16]));
        assert!(!conn.queue(&[0u8; 4]));
        assert_eq!(conn.outbox.len(), 16);
        assert_eq!(conn.dropped, 1);
    }

    #[test]
    fn test_flush_drains_outbox() {
        let (mut conn, mut client) = pair(1024);
        assert!(conn.queue(b"hello"));
        conn.flush().unwrap();
        assert_eq!(conn.outbox.len(), 0);

        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }
}
