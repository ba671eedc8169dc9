//! Multipart framing for the TCP channels
//!
//! # Frame Format
//!
//! ```text
//! ┌────────────┬──────────────────┬──────────────────────────┐
//! │ Flags (1)  │ Length (4 bytes) │ Payload (variable)       │
//! │ bit0: MORE │ Big-endian u32   │ topic or protobuf bytes  │
//! └────────────┴──────────────────┴──────────────────────────┘
//! ```
//!
//! A message is a run of frames; every frame except the last has MORE set.
//!
//! | Channel | Direction | Frames |
//! |---------|-----------|--------|
//! | status / error | server → client | `[topic][Container]` |
//! | status / error | client → server | `[0x01 topic]` subscribe, `[0x00 topic]` unsubscribe |
//! | command | both ways | `[Container]` |
//!
//! ## Error Handling
//!
//! - **Oversized frame**: connection closed
//! - **Too many parts**: connection closed
//! - **Malformed subscription**: ignored

use crate::error::{Error, Result};

/// Maximum frame payload (1MB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum frames in one message
pub const MAX_PARTS: usize = 8;

pub const HEADER_LEN: usize = 5;

pub const FLAG_MORE: u8 = 0x01;

const SUBSCRIBE: u8 = 0x01;
const UNSUBSCRIBE: u8 = 0x00;

/// Append a complete multipart message to `out`
pub fn encode_message(parts: &[&[u8]], out: &mut Vec<u8>) -> Result<()> {
    if parts.is_empty() {
        return Err(Error::InvalidFrame("empty message".to_string()));
    }
    if let Some(part) = parts.iter().find(|p| p.len() > MAX_FRAME_SIZE) {
        return Err(Error::FrameTooLarge(part.len()));
    }

    let last = parts.len() - 1;
    for (i, part) in parts.iter().enumerate() {
        let flags = if i < last { FLAG_MORE } else { 0 };
        out.push(flags);
        out.extend_from_slice(&(part.len() as u32).to_be_bytes());
        out.extend_from_slice(part);
    }
    Ok(())
}

/// Incremental decoder for a byte stream of frames
///
/// Bytes arrive in arbitrary chunks from a non-blocking socket; complete
/// messages are handed out as soon as their final frame is buffered.
/// Decoded bytes are skipped with a cursor and only compacted away on the
/// next [`push`](Self::push), so draining a burst costs time linear in its size.
#[derive(Debug, Default)]
pub struct FrameReader {
    buf: Vec<u8>,
    /// Start of the undecoded bytes in `buf`
    pos: usize,
    parts: Vec<Vec<u8>>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(data);
    }

    /// Next complete message, if one is buffered
    pub fn next_message(&mut self) -> Result<Option<Vec<Vec<u8>>>> {
        loop {
            let pending = &self.buf[self.pos..];
            if pending.len() < HEADER_LEN {
                return Ok(None);
            }

            let flags = pending[0];
            let len = u32::from_be_bytes([pending[1], pending[2], pending[3], pending[4]]) as usize;
            if len > MAX_FRAME_SIZE {
                return Err(Error::FrameTooLarge(len));
            }
            if pending.len() < HEADER_LEN + len {
                return Ok(None);
            }

            let payload = pending[HEADER_LEN..HEADER_LEN + len].to_vec();
            self.pos += HEADER_LEN + len;
            self.parts.push(payload);

            if flags & FLAG_MORE == 0 {
                return Ok(Some(std::mem::take(&mut self.parts)));
            }
            if self.parts.len() >= MAX_PARTS {
                return Err(Error::InvalidFrame(format!(
                    "more than {} parts in one message",
                    MAX_PARTS
                )));
            }
        }
    }

    /// Bytes buffered but not yet part of a complete message
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.pos + self.parts.iter().map(Vec::len).sum::<usize>()
    }
}

/// Subscription change sent by a subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionFrame {
    Subscribe(String),
    Unsubscribe(String),
}

impl SubscriptionFrame {
    pub fn parse(frame: &[u8]) -> Option<Self> {
        let (&kind, topic) = frame.split_first()?;
        let topic = std::str::from_utf8(topic).ok()?.to_string();
        match kind {
            SUBSCRIBE => Some(SubscriptionFrame::Subscribe(topic)),
            UNSUBSCRIBE => Some(SubscriptionFrame::Unsubscribe(topic)),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let (kind, topic) = match self {
            SubscriptionFrame::Subscribe(t) => (SUBSCRIBE, t),
            SubscriptionFrame::Unsubscribe(t) => (UNSUBSCRIBE, t),
        };
        let mut bytes = Vec::with_capacity(1 + topic.len());
        bytes.push(kind);
        bytes.extend_from_slice(topic.as_bytes());
        bytes
    }
}
