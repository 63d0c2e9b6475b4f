//! Decoded limit samples.

use lsw_common::{LimitPacket, LineMask, LswConfig};
use serde::Serialize;

/// A consumed packet in host terms: absolute time and named lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitSample {
    /// Raw counter at sample time.
    pub clock: u32,
    /// Overflow count at sample time.
    pub clock_overflow: u32,
    /// `clock_overflow * 2^32 + clock`.
    pub ticks: u64,
    /// `ticks / clock_hz`.
    pub seconds: f64,
    /// Raw active-line bitmask.
    pub state: u32,
    /// Names of the asserted lines, lowest bit first.
    pub lines: Vec<String>,
}

impl LimitSample {
    /// Decode `packet` with the line names and clock rate of `config`.
    pub fn from_packet(packet: &LimitPacket, config: &LswConfig) -> Self {
        let ticks = packet.absolute_ticks();
        let lines = packet
            .lines()
            .line_bits()
            .map(|bit| match config.line_name(bit) {
                Some(name) => name.to_string(),
                None => format!("bit {bit}"),
            })
            .collect();

        Self {
            clock: packet.clock,
            clock_overflow: packet.clock_overflow,
            ticks,
            seconds: ticks as f64 / config.timing.clock_hz as f64,
            state: packet.state,
            lines,
        }
    }

    /// The packet this sample was decoded from.
    pub fn packet(&self) -> LimitPacket {
        LimitPacket::new(
            self.clock,
            self.clock_overflow,
            LineMask::from_bits_retain(self.state),
        )
    }
}
