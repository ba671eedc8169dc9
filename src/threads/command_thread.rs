//! Command dispatch thread
//!
//! Receives decoded commands from the router over a bounded channel and runs
//! them against the [`CommandSink`]. Failures go back to the poll loop as
//! error notes, so every subscriber of the `error` topic sees them.

use super::PollControl;
use crate::error::Result;
use crate::machine::{Command, CommandSink};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often the idle thread checks the running flag
const IDLE_POLL: Duration = Duration::from_millis(50);

pub struct CommandThread {
    handle: JoinHandle<()>,
}

impl CommandThread {
    pub fn spawn(
        sink: Box<dyn CommandSink>,
        commands: Receiver<Command>,
        notes: Sender<PollControl>,
        timeout: Duration,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("command-dispatch".into())
            .spawn(move || run_dispatch_loop(sink, commands, notes, timeout, running))?;
        Ok(Self { handle })
    }

    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_dispatch_loop(
    mut sink: Box<dyn CommandSink>,
    commands: Receiver<Command>,
    notes: Sender<PollControl>,
    timeout: Duration,
    running: Arc<AtomicBool>,
) {
    info!("Command dispatcher started");
    let mut executed = 0u64;
    while running.load(Ordering::Relaxed) {
        let command = match commands.recv_timeout(IDLE_POLL) {
            Ok(command) => command,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        dispatch(sink.as_mut(), command, &notes, timeout);
        executed += 1;
    }
    info!("Command dispatcher stopped ({} commands)", executed);
}

fn dispatch(
    sink: &mut dyn CommandSink,
    command: Command,
    notes: &Sender<PollControl>,
    timeout: Duration,
) {
    let name = command.name();
    let start = Instant::now();
    let result = sink.execute(command);
    let elapsed = start.elapsed();
    if elapsed > timeout {
        warn!(
            "Command {} took {} ms (timeout {} ms)",
            name,
            elapsed.as_millis(),
            timeout.as_millis()
        );
    }

    match result {
        Ok(()) => debug!("Command {} executed", name),
        Err(e) => {
            warn!("Command {} failed: {}", name, e);
            // The poll loop only goes away at shutdown
            let _ = notes.send(PollControl::ErrorNote(format!("{}: {}", name, e)));
        }
    }
}
