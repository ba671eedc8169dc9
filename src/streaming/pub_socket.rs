//! Topic-based publish socket
//!
//! Subscribers connect over TCP and send subscription frames. Published
//! messages go to every subscriber holding a topic that is a prefix of the
//! message topic. The socket reports subscription changes back to its owner:
//!
//! | Event | Reported |
//! |-------|----------|
//! | subscribe frame | always, including duplicates |
//! | unsubscribe frame | when the topic's last subscription goes away |
//! | peer disconnect | as unsubscribes for topics left without subscribers |

use super::connection::{Connection, accept_pending};
use super::wire::{SubscriptionFrame, encode_message};
use crate::error::{Error, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};

/// Subscription change reported by [`PubSocket::poll`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEvent {
    pub topic: String,
    pub subscribed: bool,
}

struct Subscriber {
    conn: Connection,
    /// One entry per subscribe frame, so duplicate subscriptions nest
    topics: Vec<String>,
}

impl Subscriber {
    fn wants(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| topic.starts_with(t.as_str()))
    }
}

pub struct PubSocket {
    name: &'static str,
    listener: TcpListener,
    local_addr: SocketAddr,
    subscribers: Vec<Subscriber>,
    topic_counts: HashMap<String, usize>,
    high_water_mark: usize,
    scratch: Vec<u8>,
}

impl PubSocket {
    /// Bind a listener; `address` normally uses port 0
    pub fn bind(name: &'static str, address: &str, high_water_mark: usize) -> Result<Self> {
        let listener = TcpListener::bind(address).map_err(|source| Error::Bind {
            address: address.to_string(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        info!("{} socket bound to {}", name, local_addr);

        Ok(Self {
            name,
            listener,
            local_addr,
            subscribers: Vec::new(),
            topic_counts: HashMap::new(),
            high_water_mark,
            scratch: Vec::with_capacity(4096),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether any subscriber currently holds exactly `topic`
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.topic_counts.get(topic).is_some_and(|c| *c > 0)
    }

    /// Accept new subscribers and process their subscription frames
    pub fn poll(&mut self) -> Vec<SubscriptionEvent> {
        let accepted = accept_pending(&self.listener, self.high_water_mark, self.name);
        self.subscribers
            .extend(accepted.into_iter().map(|conn| Subscriber {
                conn,
                topics: Vec::new(),
            }));

        let mut events = Vec::new();
        let mut index = 0;
        while index < self.subscribers.len() {
            let messages = match self.subscribers[index].conn.read_messages() {
                Ok(messages) => messages,
                Err(e) => {
                    debug!(
                        "{}: dropping {}: {}",
                        self.name,
                        self.subscribers[index].conn.peer(),
                        e
                    );
                    Vec::new()
                }
            };

            for message in messages {
                for frame in message {
                    self.handle_frame(index, &frame, &mut events);
                }
            }

            if self.subscribers[index].conn.is_closed() {
                let subscriber = self.subscribers.swap_remove(index);
                self.remove_subscriber(subscriber, &mut events);
            } else {
                index += 1;
            }
        }
        events
    }

    fn handle_frame(&mut self, index: usize, frame: &[u8], events: &mut Vec<SubscriptionEvent>) {
        let subscriber = &mut self.subscribers[index];
        match SubscriptionFrame::parse(frame) {
            Some(SubscriptionFrame::Subscribe(topic)) => {
                debug!(
                    "{}: {} subscribed to '{}'",
                    self.name,
                    subscriber.conn.peer(),
                    topic
                );
                subscriber.topics.push(topic.clone());
                *self.topic_counts.entry(topic.clone()).or_insert(0) += 1;
                events.push(SubscriptionEvent {
                    topic,
                    subscribed: true,
                });
            }
            Some(SubscriptionFrame::Unsubscribe(topic)) => {
                let Some(pos) = subscriber.topics.iter().position(|t| *t == topic) else {
                    debug!("{}: unsubscribe from unknown topic '{}'", self.name, topic);
                    return;
                };
                subscriber.topics.swap_remove(pos);
                if self.release_topic(&topic) {
                    events.push(SubscriptionEvent {
                        topic,
                        subscribed: false,
                    });
                }
            }
            None => debug!("{}: ignoring malformed subscription frame", self.name),
        }
    }

    fn remove_subscriber(&mut self, subscriber: Subscriber, events: &mut Vec<SubscriptionEvent>) {
        debug!("{}: client {} disconnected", self.name, subscriber.conn.peer());
        for topic in subscriber.topics {
            if self.release_topic(&topic) {
                events.push(SubscriptionEvent {
                    topic,
                    subscribed: false,
                });
            }
        }
    }

    /// Decrement a topic count; true when it reached zero
    fn release_topic(&mut self, topic: &str) -> bool {
        match self.topic_counts.get_mut(topic) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.topic_counts.remove(topic);
                true
            }
            None => false,
        }
    }

    /// Queue a two-frame message for every matching subscriber
    ///
    /// Returns how many subscribers accepted the message. Never blocks: the
    /// bytes are written by [`flush`](Self::flush).
    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<usize> {
        self.scratch.clear();
        encode_message(&[topic.as_bytes(), payload], &mut self.scratch)?;

        let mut delivered = 0;
        for subscriber in self.subscribers.iter_mut().filter(|s| s.wants(topic)) {
            if subscriber.conn.queue(&self.scratch) {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Write pending bytes; failed peers are removed on the next poll
    pub fn flush(&mut self) {
        for subscriber in &mut self.subscribers {
            if let Err(e) = subscriber.conn.flush() {
                debug!(
                    "{}: write to {} failed: {}",
                    self.name,
                    subscriber.conn.peer(),
                    e
                );
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

    fn subscribe(stream: &mut TcpStream, topic: &str, on: bool) {
        let frame = if on {
            SubscriptionFrame::Subscribe(topic.to_string())
        } else {
            SubscriptionFrame::Unsubscribe(topic.to_string())
        };
        let mut out = Vec::new();
        encode_message(&[frame.to_bytes().as_slice()], &mut out).unwrap();
        stream.write_all(&out).unwrap();
    }

    fn poll_until(socket: &mut PubSocket, count: usize) -> Vec<SubscriptionEvent> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut events = Vec::new();
        while events.len() < count && Instant::now() < deadline {
            events.extend(socket.poll());
            std::thread::sleep(Duration::from_millis(5));
        }
        events
    }

    fn event(topic: &str, subscribed: bool) -> SubscriptionEvent {
        SubscriptionEvent {
            topic: topic.to_string(),
            subscribed,
        }
    }

    #[test]
    fn test_subscription_events() {
        let mut socket = PubSocket::bind("status", "127.0.0.1:0", 1024 * 1024).unwrap();
        let mut a = TcpStream::connect(socket.local_addr()).unwrap();
        let mut b = TcpStream::connect(socket.local_addr()).unwrap();

        subscribe(&mut a, "motion", true);
        assert_eq!(poll_until(&mut socket, 1), vec![event("motion", true)]);

        // Second subscriber to the same topic is still reported
        subscribe(&mut b, "motion", true);
        assert_eq!(poll_until(&mut socket, 1), vec![event("motion", true)]);

        // First unsubscribe leaves one holder: nothing reported
        subscribe(&mut a, "motion", false);
        assert!(poll_until(&mut socket, 1).is_empty());
        assert!(socket.is_subscribed("motion"));

        // Disconnect of the last holder reports the unsubscribe
        drop(b);
        assert_eq!(poll_until(&mut socket, 1), vec![event("motion", false)]);
        assert!(!socket.is_subscribed("motion"));
    }

    #[test]
    fn test_publish_prefix_match() {
        let mut socket = PubSocket::bind("error", "127.0.0.1:0", 1024 * 1024).unwrap();
        let mut client = TcpStream::connect(socket.local_addr()).unwrap();
        subscribe(&mut client, "err", true);
        poll_until(&mut socket, 1);

        assert_eq!(socket.publish("text", b"ignored").unwrap(), 0);
        assert_eq!(socket.publish("error", b"payload").unwrap(), 1);
        socket.flush();

        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut reader = FrameReader::new();
        let mut buf = [0u8; 256];
        let message = loop {
            let n = client.read(&mut buf).unwrap();
            reader.push(&buf[..n]);
            if let Some(message) = reader.next_message().unwrap() {
                break message;
            }
        };
        assert_eq!(message, vec![b"error".to_vec(), b"payload".to_vec()]);
    }
}
