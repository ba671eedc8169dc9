//! status-monitor - follow a running status-relay from the terminal
//!
//! Connects to the status (and optionally error) channel, mirrors the
//! machine state from the received deltas and prints a line per update.
//! Without `--status` the dsn is taken from the first UDP announcement
//! heard on `--announce`.

use clap::Parser;
use log::{info, warn};
use status_relay::client::{StatusMirror, StatusSubscriber};
use status_relay::discovery::{Announcement, ServiceRole};
use status_relay::error::{Error, Result};
use status_relay::model::Group;
use status_relay::proto::MessageType;
use std::net::UdpSocket;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "status-monitor")]
#[command(about = "Mirror and print machine status from a status-relay")]
struct Args {
    /// Status channel dsn (tcp://host:port)
    #[arg(short, long)]
    status: Option<String>,

    /// Error channel dsn
    #[arg(short, long)]
    error: Option<String>,

    /// Topics to subscribe (default: all groups)
    #[arg(short, long)]
    topic: Vec<String>,

    /// Address to listen on for service announcements
    #[arg(long, default_value = "0.0.0.0:5354")]
    announce: String,

    /// Give up discovery after this many seconds
    #[arg(long, default_value_t = 10)]
    discover_timeout: u64,
}

/// Wait for an announcement of `role` and return its dsn
fn discover(address: &str, role: ServiceRole, timeout: Duration) -> Result<String> {
    let socket = UdpSocket::bind(address)?;
    let deadline = Instant::now() + timeout;
    let mut buf = [0u8; 8192];
    info!("Waiting for a {} announcement on {}", role, address);

    while Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        socket.set_read_timeout(Some(remaining.max(Duration::from_millis(1))))?;
        let Ok((n, from)) = socket.recv_from(&mut buf) else {
            continue;
        };
        let announcement: Announcement = match serde_json::from_slice(&buf[..n]) {
            Ok(a) => a,
            Err(e) => {
                warn!("Ignoring datagram from {}: {}", from, e);
                continue;
            }
        };
        if announcement.event == "announce"
            && announcement.service.role == role
            && let Some(dsn) = announcement.service.dsn()
        {
            info!("Found {} at {}", announcement.service.name, dsn);
            return Ok(dsn.to_string());
        }
    }
    Err(Error::Discovery(format!("no {} service announced", role)))
}

fn summary(mirror: &StatusMirror, group: Group) -> String {
    let s = mirror.snapshot();
    match group {
        Group::Task => format!(
            "state={:?} mode={:?} exec={:?} file='{}' line={}",
            s.task.task_state, s.task.task_mode, s.task.exec_state, s.task.file, s.task.read_line
        ),
        Group::Motion => {
            let p = s.motion.actual_position;
            format!(
                "pos=({:.4}, {:.4}, {:.4}) vel={:.3} feed={:.2} spindle={:.0}",
                p.x, p.y, p.z, s.motion.current_vel, s.motion.feedrate, s.motion.spindle_speed
            )
        }
        Group::Io => format!(
            "estop={} flood={} mist={} tool={}",
            s.io.estop, s.io.flood, s.io.mist, s.io.tool_in_spindle
        ),
        Group::Interp => format!(
            "state={:?} command='{}'",
            s.interp.interp_state, s.interp.command
        ),
        Group::Config => format!(
            "name='{}' axes={} max_velocity={:.1}",
            s.config.name, s.config.axes, s.config.max_velocity
        ),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let timeout = Duration::from_secs(args.discover_timeout);

    let status_dsn = match args.status {
        Some(dsn) => dsn,
        None => discover(&args.announce, ServiceRole::Status, timeout)?,
    };
    let mut status = StatusSubscriber::connect_dsn(&status_dsn)?;
    let topics = if args.topic.is_empty() {
        Group::ALL.iter().map(|g| g.topic().to_string()).collect()
    } else {
        args.topic
    };
    for topic in &topics {
        status.subscribe(topic)?;
    }
    info!("Subscribed to {:?} on {}", topics, status_dsn);

    let mut errors = match &args.error {
        Some(dsn) => {
            let mut subscriber = StatusSubscriber::connect_dsn(dsn)?;
            for topic in ["error", "text", "display"] {
                subscriber.subscribe(topic)?;
            }
            Some(subscriber)
        }
        None => None,
    };

    let mut mirror = StatusMirror::new();
    loop {
        if let Some((topic, message)) = status.recv(Duration::from_millis(50))? {
            match message.message_type() {
                Some(MessageType::Ping) => info!("[{}] ping", topic),
                kind => {
                    if let Some(group) = mirror.apply(&message) {
                        println!("[{}] {:?}: {}", topic, kind, summary(&mirror, group));
                    }
                }
            }
        }

        if let Some(subscriber) = errors.as_mut()
            && let Some((topic, message)) = subscriber.recv(Duration::from_millis(10))?
            && message.message_type() != Some(MessageType::Ping)
        {
            for note in &message.note {
                println!("[{}] {:?}: {}", topic, message.message_type(), note);
            }
        }
    }
}
