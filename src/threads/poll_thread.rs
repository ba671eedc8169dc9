//! Poll loop - snapshot, diff and publish at a fixed rate.
//!
//! Each cycle:
//!
//! 1. Apply control messages (subscription changes, error notes)
//! 2. Read a snapshot if any status topic is subscribed and publish the
//!    changed groups. A group with a fresh subscription gets a full update.
//! 3. Drain controller messages onto the error topics
//! 4. Every `ping_ratio` cycles, ping every subscribed topic
//!
//! Control messages are received while waiting for the next cycle, so
//! subscriptions are picked up promptly without disturbing the cadence.
//! A failed snapshot skips step 2 and leaves the baseline untouched.

use super::PollControl;
use crate::config::ServiceConfig;
use crate::diff::DiffEngine;
use crate::error::Result;
use crate::machine::{ErrorSource, SnapshotSource};
use crate::model::Group;
use crate::proto::{Container, GroupDelta, MessageType, codec};
use crate::streaming::{Channel, Delivery, EventBus, StatusEvent};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const ERROR_TOPICS: [&str; 3] = ["error", "text", "display"];
/// Controller messages read per cycle at most
const MAX_ERRORS_PER_CYCLE: usize = 64;
/// Command failure notes queued between two cycles
const MAX_PENDING_NOTES: usize = 100;

/// Timing derived from [`ServiceConfig`]
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    /// Cycles between pings, `None` disables them
    pub ping_ratio: Option<u64>,
    /// Advertised to subscribers in `pparams`
    pub keepalive_ms: i32,
}

impl From<&ServiceConfig> for PollSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            ping_ratio: config.ping_ratio(),
            keepalive_ms: i32::try_from(config.ping_interval_ms).unwrap_or(i32::MAX),
        }
    }
}

/// Poll loop state, owned by the poll thread
pub struct PollLoop {
    engine: DiffEngine,
    snapshots: Box<dyn SnapshotSource>,
    errors: Box<dyn ErrorSource>,
    bus: EventBus,
    control: Receiver<PollControl>,
    settings: PollSettings,
    /// Subscribed topic prefixes per channel
    topics: HashMap<Channel, HashSet<String>>,
    full_update_pending: HashSet<Group>,
    error_keepalive_pending: bool,
    notes: Vec<String>,
    cycle: u64,
    failed_cycles: u64,
}

impl PollLoop {
    pub fn new(
        snapshots: Box<dyn SnapshotSource>,
        errors: Box<dyn ErrorSource>,
        bus: EventBus,
        control: Receiver<PollControl>,
        settings: PollSettings,
    ) -> Self {
        Self {
            engine: DiffEngine::new(),
            snapshots,
            errors,
            bus,
            control,
            settings,
            topics: HashMap::new(),
            full_update_pending: HashSet::new(),
            error_keepalive_pending: false,
            notes: Vec::new(),
            cycle: 0,
            failed_cycles: 0,
        }
    }

    pub fn engine(&self) -> &DiffEngine {
        &self.engine
    }

    /// Cycles skipped because the snapshot could not be read
    pub fn failed_cycles(&self) -> u64 {
        self.failed_cycles
    }

    fn subscribed(&self, channel: Channel, topic: &str) -> bool {
        self.topics
            .get(&channel)
            .is_some_and(|prefixes| prefixes.iter().any(|p| topic.starts_with(p.as_str())))
    }

    fn group_subscribed(&self, group: Group) -> bool {
        self.subscribed(Channel::Status, group.topic())
    }

    pub fn handle_control(&mut self, message: PollControl) {
        match message {
            PollControl::Subscription {
                channel,
                topic,
                subscribed: true,
            } => {
                debug!("Subscribe {:?} '{}'", channel, topic);
                match channel {
                    Channel::Status => {
                        for group in Group::ALL {
                            if group.topic().starts_with(topic.as_str()) {
                                self.full_update_pending.insert(group);
                            }
                        }
                    }
                    Channel::Error => self.error_keepalive_pending = true,
                }
                self.topics.entry(channel).or_default().insert(topic);
            }
            PollControl::Subscription {
                channel,
                topic,
                subscribed: false,
            } => {
                debug!("Unsubscribe {:?} '{}'", channel, topic);
                if let Some(prefixes) = self.topics.get_mut(&channel) {
                    prefixes.remove(&topic);
                }
            }
            PollControl::ErrorNote(note) => {
                if self.notes.len() >= MAX_PENDING_NOTES {
                    self.notes.remove(0);
                }
                self.notes.push(note);
            }
        }
    }

    /// Apply control messages until `deadline`
    fn wait_until(&mut self, deadline: Instant) {
        loop {
            match self.control.recv_deadline(deadline) {
                Ok(message) => self.handle_control(message),
                Err(RecvTimeoutError::Timeout) => return,
                Err(RecvTimeoutError::Disconnected) => {
                    thread::sleep(deadline.saturating_duration_since(Instant::now()));
                    return;
                }
            }
        }
    }

    fn publish(&self, channel: Channel, topic: &'static str, message: Container) -> Delivery {
        self.bus.publish(StatusEvent {
            channel,
            topic,
            message: Arc::new(message),
        })
    }

    /// Run one cycle without waiting
    pub fn run_cycle(&mut self) {
        while let Ok(message) = self.control.try_recv() {
            self.handle_control(message);
        }
        self.cycle += 1;

        if Group::ALL.iter().any(|&g| self.group_subscribed(g)) {
            if let Err(e) = self.publish_status() {
                self.failed_cycles += 1;
                warn!("Snapshot failed, skipping cycle {}: {}", self.cycle, e);
            }
        }

        if ERROR_TOPICS
            .iter()
            .any(|t| self.subscribed(Channel::Error, t))
        {
            self.publish_errors();
        }

        let cycle = self.cycle;
        if self.settings.ping_ratio.is_some_and(|r| r > 0 && cycle % r == 0) {
            self.publish_pings();
        }
    }

    fn publish_status(&mut self) -> Result<()> {
        let snapshot = self.snapshots.poll()?;

        for group in Group::ALL {
            if !self.group_subscribed(group) {
                continue;
            }
            let delta = self.engine.diff_group(group, &snapshot);
            let delivery = if self.full_update_pending.remove(&group) {
                let full = codec::status_update(
                    MessageType::FullUpdate,
                    self.engine.full_update(group),
                    Some(self.settings.keepalive_ms),
                );
                self.publish(Channel::Status, group.topic(), full)
            } else if let Some(delta) = delta {
                self.publish_delta(group, delta)
            } else {
                continue;
            };

            // The baseline already moved on; a lost update leaves mirrors behind
            if delivery.dropped > 0 {
                debug!("Update for '{}' dropped, resyncing next cycle", group);
                self.full_update_pending.insert(group);
            }
        }
        Ok(())
    }

    fn publish_delta(&self, group: Group, delta: GroupDelta) -> Delivery {
        let update = codec::status_update(MessageType::IncrementalUpdate, delta, None);
        self.publish(Channel::Status, group.topic(), update)
    }

    fn publish_errors(&mut self) {
        for note in std::mem::take(&mut self.notes) {
            if self.subscribed(Channel::Error, "error") {
                self.publish(
                    Channel::Error,
                    "error",
                    codec::notes(MessageType::NmlError, vec![note]),
                );
            }
        }

        for _ in 0..MAX_ERRORS_PER_CYCLE {
            match self.errors.poll_error() {
                Ok(Some(event)) => {
                    let topic = event.kind.topic();
                    if self.subscribed(Channel::Error, topic) {
                        self.publish(
                            Channel::Error,
                            topic,
                            codec::notes(event.kind.message_type(), vec![event.text]),
                        );
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Error queue read failed: {}", e);
                    break;
                }
            }
        }
    }

    fn publish_pings(&mut self) {
        for group in Group::ALL {
            if self.group_subscribed(group) {
                self.publish(Channel::Status, group.topic(), codec::ping(None));
            }
        }

        let keepalive = self
            .error_keepalive_pending
            .then_some(self.settings.keepalive_ms);
        let mut pinged = false;
        for topic in ERROR_TOPICS {
            if self.subscribed(Channel::Error, topic) {
                self.publish(Channel::Error, topic, codec::ping(keepalive));
                pinged = true;
            }
        }
        if pinged {
            self.error_keepalive_pending = false;
        }
    }

    /// Run until `running` is cleared
    pub fn run(mut self, running: Arc<AtomicBool>) {
        info!(
            "Poll loop started ({} ms interval)",
            self.settings.interval.as_millis()
        );
        while running.load(Ordering::Relaxed) {
            let deadline = Instant::now() + self.settings.interval;
            self.run_cycle();
            self.wait_until(deadline);
        }
        info!(
            "Poll loop stopped after {} cycles ({} skipped)",
            self.cycle, self.failed_cycles
        );
    }
}

/// Poll thread handle
pub struct PollThread {
    handle: JoinHandle<()>,
}

impl PollThread {
    pub fn spawn(poll_loop: PollLoop, running: Arc<AtomicBool>) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("poll-loop".into())
            .spawn(move || poll_loop.run(running))?;
        Ok(Self { handle })
    }

    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineConfig;
    use crate::machine::mock::SimulatedMachine;
    use crate::machine::{ErrorEvent, ErrorKind};
    use crossbeam_channel::{Sender, unbounded};

    struct Harness {
        machine: SimulatedMachine,
        poll: PollLoop,
        control: Sender<PollControl>,
        events: Receiver<StatusEvent>,
    }

    fn harness(ping_ratio: Option<u64>) -> Harness {
        harness_with_queue(ping_ratio, 256)
    }

    fn harness_with_queue(ping_ratio: Option<u64>, queue: usize) -> Harness {
        let machine = SimulatedMachine::new(&MachineConfig {
            seed: 3,
            ..Default::default()
        });
        let system = machine.control_system();
        let bus = EventBus::new();
        let events = bus.subscribe("test", queue);
        let (control, control_rx) = unbounded();
        let poll = PollLoop::new(
            system.snapshot_source,
            system.error_source,
            bus,
            control_rx,
            PollSettings {
                interval: Duration::from_millis(10),
                ping_ratio,
                keepalive_ms: 2000,
            },
        );
        Harness {
            machine,
            poll,
            control,
            events,
        }
    }

    fn subscribe(control: &Sender<PollControl>, channel: Channel, topic: &str) {
        control
            .send(PollControl::Subscription {
                channel,
                topic: topic.to_string(),
                subscribed: true,
            })
            .unwrap();
    }

    fn drain(events: &Receiver<StatusEvent>) -> Vec<StatusEvent> {
        events.try_iter().collect()
    }

    #[test]
    fn test_nothing_published_without_subscribers() {
        let mut h = harness(Some(1));
        h.poll.run_cycle();
        assert!(drain(&h.events).is_empty());
        // The source is not even read
        assert_eq!(h.poll.engine().baseline().config.axes, 0);
    }

    #[test]
    fn test_subscribe_triggers_full_update() {
        let mut h = harness(None);
        subscribe(&h.control, Channel::Status, "task");
        h.poll.run_cycle();

        let events = drain(&h.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].topic, "task");
        let message = &events[0].message;
        assert_eq!(message.message_type(), Some(MessageType::FullUpdate));
        assert_eq!(message.pparams.as_ref().unwrap().keepalive_timer, 2000);

        // Unchanged state publishes nothing more
        h.poll.run_cycle();
        assert!(drain(&h.events).is_empty());
    }

    #[test]
    fn test_change_publishes_incremental_update() {
        let mut h = harness(None);
        subscribe(&h.control, Channel::Status, "io");
        h.poll.run_cycle();
        drain(&h.events);

        h.machine.update(|s| s.io.flood = true);
        h.poll.run_cycle();
        let events = drain(&h.events);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].message.message_type(),
            Some(MessageType::IncrementalUpdate)
        );
        let Some(GroupDelta::Io(delta)) = &events[0].message.delta else {
            panic!("expected io delta");
        };
        assert_eq!(delta.flood, Some(true));
        assert_eq!(delta.mist, None);
    }

    #[test]
    fn test_dropped_update_triggers_resync() {
        let mut h = harness_with_queue(None, 1);
        subscribe(&h.control, Channel::Status, "io");
        h.poll.run_cycle();

        // Queue still holds the full update, so this delta is lost
        h.machine.update(|s| s.io.flood = true);
        h.poll.run_cycle();
        let events = drain(&h.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message.message_type(), Some(MessageType::FullUpdate));

        h.poll.run_cycle();
        let events = drain(&h.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message.message_type(), Some(MessageType::FullUpdate));
        let Some(GroupDelta::Io(delta)) = &events[0].message.delta else {
            panic!("expected io delta");
        };
        assert_eq!(delta.flood, Some(true));

        // Delivered, so no further resync
        h.poll.run_cycle();
        assert!(drain(&h.events).is_empty());
    }

    #[test]
    fn test_empty_prefix_subscribes_every_group() {
        let mut h = harness(None);
        subscribe(&h.control, Channel::Status, "");
        h.poll.run_cycle();
        let topics: Vec<_> = drain(&h.events).iter().map(|e| e.topic).collect();
        assert_eq!(topics, vec!["io", "task", "interp", "motion", "config"]);
    }

    #[test]
    fn test_failed_snapshot_skips_cycle() {
        let mut h = harness(None);
        subscribe(&h.control, Channel::Status, "io");
        h.poll.run_cycle();
        drain(&h.events);
        let before = h.poll.engine().baseline().clone();

        h.machine.update(|s| s.io.mist = true);
        h.machine.fail_next_polls(1);
        h.poll.run_cycle();
        assert!(drain(&h.events).is_empty());
        assert_eq!(h.poll.engine().baseline(), &before);
        assert_eq!(h.poll.failed_cycles(), 1);

        h.poll.run_cycle();
        let events = drain(&h.events);
        assert_eq!(events.len(), 1);
        assert!(h.poll.engine().baseline().io.mist);
    }

    #[test]
    fn test_unsubscribed_group_keeps_quiet() {
        let mut h = harness(None);
        subscribe(&h.control, Channel::Status, "motion");
        h.poll.run_cycle();
        drain(&h.events);

        h.control
            .send(PollControl::Subscription {
                channel: Channel::Status,
                topic: "motion".to_string(),
                subscribed: false,
            })
            .unwrap();
        h.machine.update(|s| s.motion.feedrate = 0.5);
        h.poll.run_cycle();
        assert!(drain(&h.events).is_empty());
    }

    #[test]
    fn test_pings_on_subscribed_topics() {
        let mut h = harness(Some(2));
        subscribe(&h.control, Channel::Status, "task");
        subscribe(&h.control, Channel::Error, "display");
        h.poll.run_cycle();
        drain(&h.events);

        h.poll.run_cycle();
        let pings: Vec<_> = drain(&h.events)
            .into_iter()
            .filter(|e| e.message.message_type() == Some(MessageType::Ping))
            .collect();
        assert_eq!(pings.len(), 2);
        let error_ping = pings.iter().find(|e| e.channel == Channel::Error).unwrap();
        assert_eq!(error_ping.topic, "display");
        assert!(error_ping.message.pparams.is_some());

        h.poll.run_cycle();
        h.poll.run_cycle();
        let error_ping = drain(&h.events)
            .into_iter()
            .find(|e| e.channel == Channel::Error)
            .unwrap();
        assert!(error_ping.message.pparams.is_none());
    }

    #[test]
    fn test_error_events_routed_by_topic() {
        let mut h = harness(None);
        subscribe(&h.control, Channel::Error, "error");
        h.machine
            .push_error(ErrorEvent::new(ErrorKind::OperatorError, "spindle fault"));
        h.machine
            .push_error(ErrorEvent::new(ErrorKind::NmlText, "not subscribed"));
        h.control
            .send(PollControl::ErrorNote("no such axis 9".to_string()))
            .unwrap();
        h.poll.run_cycle();

        let events = drain(&h.events);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.topic == "error"));
        assert_eq!(events[0].message.note, vec!["no such axis 9".to_string()]);
        assert_eq!(
            events[1].message.message_type(),
            Some(MessageType::OperatorError)
        );
    }
}
