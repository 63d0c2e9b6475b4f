//! Host monitor loop: polls the reader at a fixed cadence, decodes fresh
//! packets and watches for staleness.

use crate::reader::LimitReader;
use crate::sample::LimitSample;
use lsw_common::config::HostConfig;
use lsw_common::{LswConfig, SharedMemoryMap};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Counters reported when the monitor stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    /// Poll cycles run.
    pub polls: u64,
    /// Samples decoded.
    pub consumed: u64,
    /// Lap events (packets overwritten before they were read).
    pub missed: u64,
    /// Slots refused for an invalid index or header.
    pub rejected: u64,
    /// Staleness warnings raised.
    pub stale_warnings: u64,
}

/// Fixed-cadence consumer of a [`LimitReader`].
pub struct Monitor<M> {
    reader: LimitReader<M>,
    config: LswConfig,
    last_fresh: Instant,
    stale: bool,
    stats: MonitorStats,
}

impl<M: Deref<Target = SharedMemoryMap>> Monitor<M> {
    /// Monitor `reader` with the line names, clock rate and cadence of `config`.
    pub fn new(reader: LimitReader<M>, config: LswConfig) -> Self {
        Self {
            reader,
            config,
            last_fresh: Instant::now(),
            stale: false,
            stats: MonitorStats::default(),
        }
    }

    /// The wrapped reader.
    pub fn reader(&self) -> &LimitReader<M> {
        &self.reader
    }

    /// Host cadence settings.
    pub fn host_config(&self) -> &HostConfig {
        &self.config.host
    }

    /// Counters so far.
    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            consumed: self.reader.consumed(),
            missed: self.reader.missed(),
            rejected: self.reader.rejected(),
            ..self.stats
        }
    }

    /// Whether no fresh sample arrived within `stale_after` of `now`.
    pub fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_fresh) >= self.config.host.stale_after()
    }

    /// One poll cycle at time `now`. Invalid slots are logged and skipped.
    pub fn tick(&mut self, now: Instant) -> Option<LimitSample> {
        self.stats.polls += 1;
        match self.reader.poll() {
            Ok(Some(packet)) => {
                if self.stale {
                    info!("Limit samples resumed");
                }
                self.last_fresh = now;
                self.stale = false;
                Some(LimitSample::from_packet(&packet, &self.config))
            }
            Ok(None) | Err(_) => {
                if !self.stale && self.is_stale(now) {
                    warn!(
                        "No limit sample for {:?} (overflow count {})",
                        self.config.host.stale_after(),
                        self.reader.overflow_count()
                    );
                    self.stale = true;
                    self.stats.stale_warnings += 1;
                }
                None
            }
        }
    }

    /// Poll every `poll_interval` until `running` is cleared or `deadline`
    /// passes, handing each fresh sample to `sink`.
    pub fn run<F>(&mut self, running: &AtomicBool, deadline: Option<Instant>, mut sink: F) -> MonitorStats
    where
        F: FnMut(&LimitSample),
    {
        let interval = self.config.host.poll_interval();
        info!("Monitoring limit switches every {:?}", interval);

        while running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                break;
            }
            if let Some(sample) = self.tick(now) {
                sink(&sample);
            }
            let elapsed = now.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }

        // Drain whatever was published last.
        if let Some(sample) = self.tick(Instant::now()) {
            sink(&sample);
        }

        let stats = self.stats();
        info!(
            "Monitor stopped: {} samples, {} laps, {} rejected",
            stats.consumed, stats.missed, stats.rejected
        );
        stats
    }

    /// Give back the reader, e.g. to request a stop after monitoring.
    pub fn into_reader(self) -> LimitReader<M> {
        self.reader
    }
}
