//! Router thread - sole owner of the network sockets.
//!
//! Each iteration:
//!
//! 1. Accept peers and read subscription frames on both publish sockets,
//!    forwarding changes to the poll loop
//! 2. Read command requests. Pings and invalid requests are answered on the
//!    spot; valid commands are handed to the dispatcher with `try_send`
//! 3. Wait up to one tick for outbound events, then drain and publish them
//! 4. Flush every socket without blocking
//!
//! Nothing here blocks on a peer, so a stalled subscriber or command client
//! cannot hold up the others.

use super::PollControl;
use crate::error::Result;
use crate::machine::Command;
use crate::proto::{Container, MessageType, codec};
use crate::streaming::{Channel, CommandRequest, CommandSocket, PubSocket, StatusEvent};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Outbound events published per tick before sockets are serviced again
const MAX_EVENTS_PER_TICK: usize = 256;

pub const NOTE_INVALID_MESSAGE: &str = "invalid message";
pub const NOTE_QUEUE_FULL: &str = "command queue full";

/// The three bound sockets, moved into the router thread
pub struct RouterSockets {
    pub status: PubSocket,
    pub error: PubSocket,
    pub command: CommandSocket,
}

struct Router {
    sockets: RouterSockets,
    events: Receiver<StatusEvent>,
    control: Sender<PollControl>,
    commands: Sender<Command>,
    tick: Duration,
}

impl Router {
    fn forward_subscriptions(&mut self) {
        let channels = [
            (Channel::Status, &mut self.sockets.status),
            (Channel::Error, &mut self.sockets.error),
        ];
        for (channel, socket) in channels {
            for event in socket.poll() {
                let message = PollControl::Subscription {
                    channel,
                    topic: event.topic,
                    subscribed: event.subscribed,
                };
                if self.control.send(message).is_err() {
                    debug!("Poll loop gone, subscription change dropped");
                }
            }
        }
    }

    fn serve_commands(&mut self) {
        for request in self.sockets.command.poll() {
            if let Some(reply) = self.route(&request) {
                let payload = codec::encode(&reply);
                if !self.sockets.command.reply(request.client, &payload) {
                    debug!("Reply to client {} dropped", request.client);
                }
            }
        }
    }

    /// Decide what to do with one request; `Some` is an immediate reply
    fn route(&self, request: &CommandRequest) -> Option<Container> {
        let rx = match codec::decode(&request.payload) {
            Ok(rx) => rx,
            Err(e) => {
                debug!("Undecodable request from client {}: {}", request.client, e);
                return Some(error_reply(NOTE_INVALID_MESSAGE));
            }
        };

        if rx.message_type() == Some(MessageType::Ping) {
            return Some(codec::reply(MessageType::PingAcknowledge));
        }

        let command = match Command::from_container(&rx) {
            Ok(command) => command,
            Err(e) => {
                debug!("Rejected request type {}: {}", rx.r#type, e);
                return Some(error_reply(&e.to_string()));
            }
        };

        let name = command.name();
        match self.commands.try_send(command) {
            Ok(()) => {
                debug!("Queued command {}", name);
                None
            }
            Err(TrySendError::Full(_)) => {
                warn!("Command queue full, rejecting {}", name);
                Some(error_reply(NOTE_QUEUE_FULL))
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Command dispatcher gone, rejecting {}", name);
                Some(error_reply(NOTE_QUEUE_FULL))
            }
        }
    }

    fn publish(&mut self, event: StatusEvent) {
        let payload = codec::encode(&event.message);
        let socket = match event.channel {
            Channel::Status => &mut self.sockets.status,
            Channel::Error => &mut self.sockets.error,
        };
        if let Err(e) = socket.publish(event.topic, &payload) {
            error!("{}: publish on '{}' failed: {}", socket.name(), event.topic, e);
        }
    }

    fn pump_events(&mut self) {
        match self.events.recv_timeout(self.tick) {
            Ok(event) => self.publish(event),
            Err(RecvTimeoutError::Timeout) => return,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(self.tick);
                return;
            }
        }
        for _ in 1..MAX_EVENTS_PER_TICK {
            match self.events.try_recv() {
                Ok(event) => self.publish(event),
                Err(_) => break,
            }
        }
    }

    fn flush(&mut self) {
        self.sockets.status.flush();
        self.sockets.error.flush();
        self.sockets.command.flush();
    }

    fn iterate(&mut self) {
        self.forward_subscriptions();
        self.serve_commands();
        self.pump_events();
        self.flush();
    }

    fn run(mut self, running: Arc<AtomicBool>) {
        info!(
            "Router started (status {}, error {}, command {})",
            self.sockets.status.local_addr(),
            self.sockets.error.local_addr(),
            self.sockets.command.local_addr()
        );
        while running.load(Ordering::Relaxed) {
            self.iterate();
        }
        // Best effort for anything still queued
        self.flush();
        info!("Router stopped");
    }
}

fn error_reply(note: &str) -> Container {
    codec::notes(MessageType::Error, vec![note.to_string()])
}

pub struct RouterThread {
    handle: JoinHandle<()>,
}

impl RouterThread {
    pub fn spawn(
        sockets: RouterSockets,
        events: Receiver<StatusEvent>,
        control: Sender<PollControl>,
        commands: Sender<Command>,
        tick: Duration,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let router = Router {
            sockets,
            events,
            control,
            commands,
            tick,
        };
        let handle = thread::Builder::new()
            .name("router".into())
            .spawn(move || router.run(running))?;
        Ok(Self { handle })
    }

    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}
