//! # LSW Host Binary
//!
//! Attaches to a sampler's region file, prints every fresh limit sample and
//! optionally stops the sampler.
//!
//! # Usage
//!
//! ```bash
//! # Print samples as text until Ctrl-C
//! lsw_host --region /dev/shm/lsw_region
//!
//! # JSON lines, stop the sampler after 5 seconds
//! lsw_host --output json --stop-after-ms 5000
//!
//! # Stop the sampler and exit
//! lsw_host --stop
//! ```

#![deny(warnings)]

use clap::{Parser, ValueEnum};
use lsw_common::config::LogLevel;
use lsw_common::LswConfig;
use lsw_host::{LimitReader, LimitSample, Monitor};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Sample output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    /// One human-readable line per sample
    Text,
    /// One JSON object per line
    Json,
    /// 16-byte little-endian packet image, hex encoded
    Wire,
}

/// LSW Host - limit-switch sample monitor
#[derive(Parser, Debug)]
#[command(name = "lsw_host")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Reads limit-switch samples from a shared-memory region")]
#[command(long_about = None)]
struct Args {
    /// Path to the TOML configuration. Built-in defaults when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Shared-memory region file written by the sampler.
    #[arg(short, long, default_value = "/dev/shm/lsw_region")]
    region: PathBuf,

    /// Sample output format
    #[arg(short, long, value_enum, default_value_t = Output::Text)]
    output: Output,

    /// Request a sampler stop after this many milliseconds
    #[arg(long, value_name = "MS")]
    stop_after_ms: Option<u64>,

    /// Request a sampler stop immediately and exit
    #[arg(long)]
    stop: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Host failed: {}", e);
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
    info!("LSW host v{} starting...", env!("CARGO_PKG_VERSION"));

    let reader = LimitReader::attach(&args.region)?;
    if args.stop {
        reader.request_stop();
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let deadline = args
        .stop_after_ms
        .map(|ms| Instant::now() + Duration::from_millis(ms));
    let output = args.output;
    let mut stdout = std::io::stdout().lock();
    let mut monitor = Monitor::new(reader, config);

    monitor.run(&running, deadline, |sample| {
        if let Err(e) = print_sample(&mut stdout, output, sample) {
            warn!("Failed to write sample: {}", e);
        }
    });

    if deadline.is_some() && running.load(Ordering::SeqCst) {
        monitor.into_reader().request_stop();
    }

    info!("LSW host shutdown complete");
    Ok(())
}

fn print_sample(
    out: &mut impl Write,
    output: Output,
    sample: &LimitSample,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Output::Text => writeln!(
            out,
            "{:>14.9}s  overflow={:<4} clock={:<10} lines=[{}]",
            sample.seconds,
            sample.clock_overflow,
            sample.clock,
            sample.lines.join(", ")
        )?,
        Output::Json => writeln!(out, "{}", serde_json::to_string(sample)?)?,
        Output::Wire => {
            let hex: String = sample
                .packet()
                .to_le_bytes()
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect();
            writeln!(out, "{hex}")?
        }
    }
    Ok(())
}

/// Setup tracing subscriber from CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(configured)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr so sample output on stdout stays parseable.
    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
