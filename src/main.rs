//! status-relay - machine status replication daemon
//!
//! ## Channels
//!
//! - **Status** (pub/sub): per-group full and incremental updates
//! - **Error** (pub/sub): controller and operator messages
//! - **Command** (request/reply): machine commands, ping
//!
//! All three bind ephemeral ports and are advertised through service
//! discovery. Runs against the built-in simulated machine.

use clap::Parser;
use log::{error, info, warn};
use status_relay::app::install_signal_handler;
use status_relay::config::Config;
use status_relay::discovery::create_registry;
use status_relay::error::Result;
use status_relay::machine::mock::SimulatedMachine;
use status_relay::StatusService;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "status-relay")]
#[command(version, about = "Publish machine status deltas over pub/sub sockets")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Force debug logging
    #[arg(short, long)]
    debug: bool,

    /// Bind to 127.0.0.1 only
    #[arg(long)]
    loopback: bool,

    /// Override the poll interval
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Do not advertise the service
    #[arg(long)]
    no_discovery: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if args.loopback {
        config.service.loopback = true;
    }
    if let Some(interval) = args.poll_interval_ms {
        config.service.poll_interval_ms = interval;
    }
    if args.no_discovery {
        config.discovery.enabled = false;
    }

    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    );
    if args.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    info!("status-relay v{} starting", env!("CARGO_PKG_VERSION"));
    match &args.config {
        Some(path) => info!("Using config: {}", path.display()),
        None => info!("Using built-in defaults"),
    }

    let machine = SimulatedMachine::new(&config.machine);
    let mut service = StatusService::start(&config, machine.control_system())?;

    let mut advertiser = if config.discovery.enabled {
        let mut advertiser = match create_registry(&config.discovery) {
            Ok(registry) => service.advertiser(registry, &config),
            Err(e) => {
                error!("Service discovery unavailable: {}", e);
                service.stop();
                return Err(e);
            }
        };
        if let Err(e) = advertiser.register_all() {
            error!("Service registration failed: {}", e);
            service.stop();
            return Err(e);
        }
        info!("Advertised instance {}", advertiser.instance_id());
        Some(advertiser)
    } else {
        info!("Service discovery disabled");
        None
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    install_signal_handler(Arc::clone(&shutdown))?;
    info!("Press Ctrl+C to stop");

    let refresh_interval = config.discovery.announce_interval();
    let mut last_refresh = Instant::now();
    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(100));

        if let Some(adv) = advertiser.as_mut()
            && last_refresh.elapsed() >= refresh_interval
        {
            last_refresh = Instant::now();
            if let Err(e) = adv.refresh() {
                warn!("Lost service registration ({}), shutting down", e);
                break;
            }
        }
    }

    // Withdraw the records before the sockets go away
    if let Some(mut adv) = advertiser.take() {
        adv.unregister_all();
    }
    service.stop();
    info!("status-relay stopped");
    Ok(())
}
