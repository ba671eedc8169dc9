//! Worker threads of the relay service
//!
//! - `PollThread`: fixed-rate snapshot, diff and publish (`poll-loop`)
//! - `RouterThread`: owns every socket, forwards subscriptions and commands (`router`)
//! - `CommandThread`: executes decoded commands against the controller (`command-dispatch`)

mod command_thread;
mod poll_thread;
mod router_thread;

pub use command_thread::CommandThread;
pub use poll_thread::{PollLoop, PollSettings, PollThread};
pub use router_thread::{RouterSockets, RouterThread};

use crate::streaming::Channel;

/// Messages consumed by the poll loop between cycles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollControl {
    /// A topic gained a subscriber, or lost its last one
    Subscription {
        channel: Channel,
        topic: String,
        subscribed: bool,
    },
    /// Command failure to report on the `error` topic
    ErrorNote(String),
}
