//! Network transport for the status, error and command channels
//!
//! ```text
//!            ┌──────────────┐   StatusEvent    ┌────────────────┐
//!  poll-loop │  EventBus    │ ───────────────> │ router thread  │
//!            └──────────────┘                  │  PubSocket x2  │──> subscribers
//!                                              │  CommandSocket │<─> command clients
//!                                              └────────────────┘
//! ```
//!
//! All sockets are non-blocking and owned by the router thread.

mod bus;
mod command_socket;
mod connection;
mod pub_socket;
pub mod wire;

pub use bus::{Channel, Delivery, EventBus, StatusEvent};
pub use command_socket::{ClientId, CommandRequest, CommandSocket};
pub use pub_socket::{PubSocket, SubscriptionEvent};
pub use wire::{FrameReader, SubscriptionFrame};
