//! Service orchestration
//!
//! [`StatusService::start`] binds the three sockets, wires the channels and
//! spawns the worker threads:
//!
//! ```text
//!                 control (unbounded)
//!   router ───────────────────────────────> poll-loop
//!     │  ^                                     │
//!     │  └──────── EventBus (bounded) ─────────┘
//!     │ commands (bounded, try_send)
//!     v                     error notes
//!   command-dispatch ────────────────────────> poll-loop
//! ```
//!
//! The caller owns discovery and the shutdown signal; `stop` clears the
//! shared running flag and joins every thread.

use crate::config::Config;
use crate::discovery::{ServiceAdvertiser, ServiceRegistry, ServiceRole};
use crate::error::{Error, Result};
use crate::machine::ControlSystem;
use crate::streaming::{CommandSocket, EventBus, PubSocket, StatusEvent};
use crate::threads::{
    CommandThread, PollLoop, PollSettings, PollThread, RouterSockets, RouterThread,
};
use crossbeam_channel::{Receiver, bounded, unbounded};
use log::{error, info};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A bound socket as clients should see it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundEndpoint {
    pub role: ServiceRole,
    pub port: u16,
    /// `tcp://<host>:<port>`, captured right after bind
    pub dsn: String,
}

/// Running relay: three sockets, three threads
pub struct StatusService {
    running: Arc<AtomicBool>,
    bus: EventBus,
    endpoints: Vec<BoundEndpoint>,
    poll: Option<PollThread>,
    router: Option<RouterThread>,
    command: Option<CommandThread>,
}

impl StatusService {
    /// Bind all sockets and start the worker threads
    ///
    /// Fails with [`Error::Bind`] if any socket cannot be bound; nothing is
    /// left running in that case.
    pub fn start(config: &Config, system: ControlSystem) -> Result<Self> {
        let service = &config.service;
        let address = service.bind_address();
        let hwm = service.send_high_water_mark;

        let status = PubSocket::bind("status", &address, hwm)?;
        let error = PubSocket::bind("error", &address, hwm)?;
        let command = CommandSocket::bind(&address, hwm)?;

        let host = service.dsn_host();
        let endpoints = [
            (ServiceRole::Status, status.local_addr().port()),
            (ServiceRole::Error, error.local_addr().port()),
            (ServiceRole::Command, command.local_addr().port()),
        ]
        .into_iter()
        .map(|(role, port)| BoundEndpoint {
            role,
            port,
            dsn: format!("tcp://{}:{}", host, port),
        })
        .collect::<Vec<_>>();
        for endpoint in &endpoints {
            info!("{} channel at {}", endpoint.role, endpoint.dsn);
        }

        let running = Arc::new(AtomicBool::new(true));
        let bus = EventBus::new();
        let router_events = bus.subscribe("router", service.event_queue);
        let (control_tx, control_rx) = unbounded();
        let (command_tx, command_rx) = bounded(service.command_queue.max(1));

        let ControlSystem {
            snapshot_source,
            error_source,
            command_sink,
        } = system;

        let mut this = Self {
            running: Arc::clone(&running),
            bus: bus.clone(),
            endpoints,
            poll: None,
            router: None,
            command: None,
        };

        // Any spawn failure drops `this`, which stops what already started
        this.router = Some(RouterThread::spawn(
            RouterSockets {
                status,
                error,
                command,
            },
            router_events,
            control_tx.clone(),
            command_tx,
            service.router_tick(),
            Arc::clone(&running),
        )?);
        this.command = Some(CommandThread::spawn(
            command_sink,
            command_rx,
            control_tx,
            service.command_timeout(),
            Arc::clone(&running),
        )?);
        let poll_loop = PollLoop::new(
            snapshot_source,
            error_source,
            bus,
            control_rx,
            PollSettings::from(service),
        );
        this.poll = Some(PollThread::spawn(poll_loop, running)?);

        info!("Status service started");
        Ok(this)
    }

    pub fn endpoints(&self) -> &[BoundEndpoint] {
        &self.endpoints
    }

    pub fn endpoint(&self, role: ServiceRole) -> Option<&BoundEndpoint> {
        self.endpoints.iter().find(|e| e.role == role)
    }

    /// Receive every published event in-process
    pub fn subscribe_local(&self, name: &str, capacity: usize) -> Receiver<StatusEvent> {
        self.bus.subscribe(name, capacity)
    }

    /// Advertiser describing this service's three sockets
    pub fn advertiser(&self, registry: Box<dyn ServiceRegistry>, config: &Config) -> ServiceAdvertiser {
        let mut advertiser = ServiceAdvertiser::new(
            registry,
            &config.discovery,
            &config.service.name,
            config.service.dsn_host(),
        );
        for endpoint in &self.endpoints {
            advertiser.add_endpoint(endpoint.role, endpoint.port, &endpoint.dsn);
        }
        advertiser
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop and join all threads; idempotent
    pub fn stop(&mut self) {
        if self.poll.is_none() && self.router.is_none() && self.command.is_none() {
            return;
        }
        info!("Stopping status service");
        self.running.store(false, Ordering::Relaxed);

        if let Some(poll) = self.poll.take()
            && poll.join().is_err()
        {
            error!("Poll thread panicked");
        }
        if let Some(command) = self.command.take()
            && command.join().is_err()
        {
            error!("Command thread panicked");
        }
        if let Some(router) = self.router.take()
            && router.join().is_err()
        {
            error!("Router thread panicked");
        }
        info!("Status service stopped");
    }
}

impl Drop for StatusService {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Set `shutdown` on SIGINT or SIGTERM
pub fn install_signal_handler(shutdown: Arc<AtomicBool>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|e| Error::Other(format!("Failed to register signal handlers: {}", e)))?;
    std::thread::Builder::new()
        .name("signal-handler".to_string())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!("Received signal {}, initiating shutdown", sig);
                shutdown.store(true, Ordering::Relaxed);
            }
        })?;
    Ok(())
}
