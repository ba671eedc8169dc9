//! Machine status relay
//!
//! Polls a machine controller at a fixed rate, diffs each snapshot against
//! the last published state and streams per-group deltas to subscribers.
//!
//! ```text
//! SnapshotSource ──> PollLoop ──> DiffEngine ──> EventBus ──> router ──> status / error sockets
//!                                                               │
//!                     CommandSink <── command-dispatch <────────┴── command socket
//! ```
//!
//! The three sockets are advertised through a [`discovery::ServiceRegistry`].

pub mod app;
pub mod client;
pub mod config;
pub mod diff;
pub mod discovery;
pub mod error;
pub mod machine;
pub mod model;
pub mod proto;
pub mod streaming;
pub mod threads;

pub use app::{BoundEndpoint, StatusService};
pub use config::Config;
pub use error::{Error, Result};
