//! # LSW Sampler Binary
//!
//! Runs the limit-switch sampler against a simulated board over a
//! file-backed shared-memory region, so a host process can attach to the
//! same region and read packets.
//!
//! # Usage
//!
//! ```bash
//! # Default wiring, region in /dev/shm
//! lsw_sampler
//!
//! # Scripted pulses and custom timing
//! lsw_sampler --config config/lsw.toml --region /dev/shm/lsw_region
//!
//! # Verbose JSON logs
//! lsw_sampler -v --json
//! ```

#![deny(warnings)]

use clap::Parser;
use lsw_common::config::LogLevel;
use lsw_common::{LswConfig, MappedRegion, SharedMemoryMap};
use lsw_sampler::control::{LimitSampler, SamplerSettings, run_and_halt};
use lsw_sampler::hw::Halt;
use lsw_sampler::sim::{SimBoard, SimClock};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// How often the simulated sibling looks at the overflow flag.
const SIBLING_PERIOD: Duration = Duration::from_millis(1);

/// LSW Sampler - limit-switch sampler on a simulated board
#[derive(Parser, Debug)]
#[command(name = "lsw_sampler")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Limit-switch sampler with double-buffered shared-memory publishing")]
#[command(long_about = None)]
struct Args {
    /// Path to the TOML configuration. Built-in defaults when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Shared-memory region file (created or truncated).
    #[arg(short, long, default_value = "/dev/shm/lsw_region")]
    region: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

/// Ends the process once the sampler has halted.
struct ProcessHalt<'a> {
    sibling_done: &'a AtomicBool,
}

impl Halt for ProcessHalt<'_> {
    fn halt(self) -> ! {
        self.sibling_done.store(true, Ordering::Release);
        info!("LSW sampler halted");
        std::process::exit(0)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Sampler startup failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => LswConfig::from_file(path),
        None => Ok(LswConfig::default()),
    };

    // Tracing comes up before the config is checked so a rejected file is reported.
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);
    let config = config?;

    info!("LSW sampler v{} starting...", env!("CARGO_PKG_VERSION"));
    if detect_rt_mode() {
        info!("Running in real-time mode");
    } else {
        info!("Running in standard (non-RT) mode");
    }

    let region = MappedRegion::create(&args.region)?;
    info!(
        "Shared region {} ({} bytes)",
        region.path().display(),
        SharedMemoryMap::SIZE
    );

    // Ctrl-C raises the run flag exactly like a host stop request.
    let stopper = MappedRegion::attach(&args.region)?;
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        stopper.run_flag.store(1, Ordering::Release);
    })?;

    let map: &SharedMemoryMap = &region;
    let settings = SamplerSettings::from_config(&config);
    let board = SimBoard::from_config(
        map,
        &config,
        SimClock::Wall {
            clock_hz: config.timing.clock_hz,
        },
    );
    let sibling_done = AtomicBool::new(false);

    std::thread::scope(|s| -> Result<(), Box<dyn std::error::Error>> {
        s.spawn(|| board.run_sibling(&sibling_done, SIBLING_PERIOD));
        let sampler = LimitSampler::new(map, board.board(), settings);
        run_and_halt(
            sampler,
            ProcessHalt {
                sibling_done: &sibling_done,
            },
        )
    })
}

/// Setup tracing subscriber from CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(configured)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Whether the process runs under a real-time scheduling policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        // SAFETY: sched_getscheduler(0) only queries the calling process.
        let policy = unsafe { sched_getscheduler(0) };
        policy == SCHED_FIFO || policy == SCHED_RR
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}
