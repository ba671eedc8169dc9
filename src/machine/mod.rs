//! Interfaces to the controlled machine
//!
//! The relay never talks to a controller directly. It is handed a
//! [`ControlSystem`] at construction time holding three trait objects:
//!
//! | Trait | Called from | Purpose |
//! |-------|-------------|---------|
//! | [`SnapshotSource`] | poll-loop | one consistent status read per cycle |
//! | [`ErrorSource`] | poll-loop | drain controller error/operator messages |
//! | [`CommandSink`] | command-dispatch | execute decoded commands |
//!
//! [`mock::SimulatedMachine`] implements all three for running without a
//! controller.

mod command;
pub mod mock;

pub use command::{Command, ToolOffset};

use crate::error::Result;
use crate::model::StateSnapshot;
use crate::proto::MessageType;

/// Produces complete status snapshots
pub trait SnapshotSource: Send {
    fn poll(&mut self) -> Result<StateSnapshot>;
}

/// Queue of controller and operator messages
pub trait ErrorSource: Send {
    /// Next pending message, `None` when the queue is empty
    fn poll_error(&mut self) -> Result<Option<ErrorEvent>>;
}

/// Executes commands against the controller
pub trait CommandSink: Send {
    fn execute(&mut self, command: Command) -> Result<()>;
}

/// Origin and severity of an error-channel message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NmlError,
    NmlText,
    NmlDisplay,
    OperatorError,
    OperatorText,
    OperatorDisplay,
}

impl ErrorKind {
    pub fn message_type(self) -> MessageType {
        match self {
            ErrorKind::NmlError => MessageType::NmlError,
            ErrorKind::NmlText => MessageType::NmlText,
            ErrorKind::NmlDisplay => MessageType::NmlDisplay,
            ErrorKind::OperatorError => MessageType::OperatorError,
            ErrorKind::OperatorText => MessageType::OperatorText,
            ErrorKind::OperatorDisplay => MessageType::OperatorDisplay,
        }
    }

    /// Error-channel topic: `error`, `text` or `display`
    pub fn topic(self) -> &'static str {
        match self {
            ErrorKind::NmlError | ErrorKind::OperatorError => "error",
            ErrorKind::NmlText | ErrorKind::OperatorText => "text",
            ErrorKind::NmlDisplay | ErrorKind::OperatorDisplay => "display",
        }
    }
}

/// One message from the controller's error queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub text: String,
}

impl ErrorEvent {
    pub fn new(kind: ErrorKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Controller collaborators, injected into the service at start
pub struct ControlSystem {
    pub snapshot_source: Box<dyn SnapshotSource>,
    pub error_source: Box<dyn ErrorSource>,
    pub command_sink: Box<dyn CommandSink>,
}
