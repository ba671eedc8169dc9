//! In-process event bus between the Poll Loop and its consumers
//!
//! The Poll Loop never touches a socket. Every message it produces is a
//! typed [`StatusEvent`] fanned out to registered listeners with `try_send`,
//! so a slow or stalled listener costs a dropped event, never a blocked
//! poll cycle. The router is one listener; tests and embedding code can
//! register more.

use crate::proto::Container;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// Which publish socket an event is destined for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Status,
    Error,
}

/// One outbound message
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub channel: Channel,
    pub topic: &'static str,
    pub message: Arc<Container>,
}

/// Outcome of one [`EventBus::publish`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Listeners that queued the event
    pub delivered: usize,
    /// Listeners that were full and lost it
    pub dropped: usize,
}

struct Listener {
    name: String,
    tx: Sender<StatusEvent>,
    dropped: u64,
}

/// Cloneable handle to the listener list
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener with its own bounded queue
    pub fn subscribe(&self, name: &str, capacity: usize) -> Receiver<StatusEvent> {
        let (tx, rx) = bounded(capacity.max(1));
        self.listeners.lock().push(Listener {
            name: name.to_string(),
            tx,
            dropped: 0,
        });
        debug!("Event bus listener '{}' registered", name);
        rx
    }

    /// Deliver to every listener without blocking
    ///
    /// Listeners whose receiver was dropped are removed and counted in
    /// neither field of the returned [`Delivery`].
    pub fn publish(&self, event: StatusEvent) -> Delivery {
        let mut listeners = self.listeners.lock();
        let mut delivery = Delivery::default();
        listeners.retain_mut(|listener| match listener.tx.try_send(event.clone()) {
            Ok(()) => {
                delivery.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                delivery.dropped += 1;
                listener.dropped += 1;
                if listener.dropped == 1 || listener.dropped % 100 == 0 {
                    warn!(
                        "Event bus listener '{}' is full, {} events dropped",
                        listener.name, listener.dropped
                    );
                }
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Event bus listener '{}' went away", listener.name);
                false
            }
        });
        delivery
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}
