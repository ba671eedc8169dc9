//! Wire protocol
//!
//! All three channels exchange protobuf `Container` messages. Status deltas
//! travel in the `delta` oneof, error notes and command replies in `note`,
//! command arguments in `command`.
//!
//! | Channel | Topics | Message types |
//! |---------|--------|---------------|
//! | status  | config, io, task, interp, motion | FullUpdate, IncrementalUpdate, Ping |
//! | error   | error, text, display | Nml*/Operator*, Ping |
//! | command | (request/reply) | Ping → PingAcknowledge, commands → Error on rejection |

pub mod codec;
mod messages;
mod types;

pub use messages::*;
pub use types::*;
