//! Container builders and decoding
//!
//! Every frame on the three channels is a single `Container`. This module
//! builds the handful of shapes the service emits and decodes inbound bytes.

use super::messages::{Container, GroupDelta, ProtocolParameters};
use super::types::MessageType;
use crate::error::Result;
use crate::model::Group;
use prost::Message;

/// Status update for one group
///
/// Full updates carry the keepalive interval so late joiners learn the
/// ping cadence together with the complete state.
pub fn status_update(kind: MessageType, delta: GroupDelta, keepalive_ms: Option<i32>) -> Container {
    Container {
        r#type: kind as i32,
        pparams: keepalive_ms.map(|keepalive_timer| ProtocolParameters { keepalive_timer }),
        delta: Some(delta),
        ..Default::default()
    }
}

/// Keepalive on a subscribed topic
pub fn ping(keepalive_ms: Option<i32>) -> Container {
    Container {
        r#type: MessageType::Ping as i32,
        pparams: keepalive_ms.map(|keepalive_timer| ProtocolParameters { keepalive_timer }),
        ..Default::default()
    }
}

/// Message carrying only notes (error channel and command replies)
pub fn notes(kind: MessageType, notes: Vec<String>) -> Container {
    Container {
        r#type: kind as i32,
        note: notes,
        ..Default::default()
    }
}

/// Reply with no payload (ping acknowledge)
pub fn reply(kind: MessageType) -> Container {
    Container {
        r#type: kind as i32,
        ..Default::default()
    }
}

pub fn encode(container: &Container) -> Vec<u8> {
    container.encode_to_vec()
}

pub fn decode(bytes: &[u8]) -> Result<Container> {
    Ok(Container::decode(bytes)?)
}

impl Container {
    /// Message type, or `None` for values this build does not know
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::try_from(self.r#type).ok()
    }

    /// Group of the status payload, if any
    pub fn group(&self) -> Option<Group> {
        self.delta.as_ref().map(GroupDelta::group)
    }

    /// Whether a status payload belongs on `topic`
    ///
    /// Containers without a payload (pings) are valid on every topic.
    pub fn matches_topic(&self, topic: &str) -> bool {
        match self.group() {
            Some(group) => group.topic() == topic,
            None => true,
        }
    }
}

impl GroupDelta {
    pub fn group(&self) -> Group {
        match self {
            GroupDelta::Config(_) => Group::Config,
            GroupDelta::Io(_) => Group::Io,
            GroupDelta::Task(_) => Group::Task,
            GroupDelta::Interp(_) => Group::Interp,
            GroupDelta::Motion(_) => Group::Motion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{MotionAxisDelta, MotionDelta, TaskDelta};

    #[test]
    fn test_status_update_roundtrip() {
        let delta = GroupDelta::Motion(MotionDelta {
            axis: vec![MotionAxisDelta {
                index: 0,
                enabled: Some(true),
                ..Default::default()
            }],
            ..Default::default()
        });
        let msg = status_update(MessageType::IncrementalUpdate, delta.clone(), None);

        let decoded = decode(&encode(&msg)).unwrap();
        assert_eq!(decoded.message_type(), Some(MessageType::IncrementalUpdate));
        assert_eq!(decoded.delta, Some(delta));
        assert!(decoded.pparams.is_none());
        assert!(decoded.matches_topic("motion"));
        assert!(!decoded.matches_topic("task"));
    }

    #[test]
    fn test_full_update_carries_keepalive() {
        let delta = GroupDelta::Task(TaskDelta::default());
        let msg = status_update(MessageType::FullUpdate, delta, Some(2000));
        let decoded = decode(&encode(&msg)).unwrap();
        assert_eq!(decoded.pparams.map(|p| p.keepalive_timer), Some(2000));
    }

    #[test]
    fn test_unset_fields_are_absent() {
        let delta = TaskDelta {
            file: Some(String::new()),
            ..Default::default()
        };
        let decoded = decode(&encode(&status_update(
            MessageType::IncrementalUpdate,
            GroupDelta::Task(delta),
            None,
        )))
        .unwrap();

        let Some(GroupDelta::Task(task)) = decoded.delta else {
            panic!("expected task delta");
        };
        // Explicitly-set empty string survives; untouched fields stay None
        assert_eq!(task.file.as_deref(), Some(""));
        assert_eq!(task.read_line, None);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode(&[0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_ping_matches_any_topic() {
        let msg = ping(None);
        assert!(msg.matches_topic("config"));
        assert_eq!(msg.message_type(), Some(MessageType::Ping));
    }
}
