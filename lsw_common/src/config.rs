//! Configuration loading traits and types.
//!
//! Both binaries read one TOML file. Every section is optional and falls
//! back to the reference target's values.
//!
//! # Usage
//!
//! ```rust,no_run
//! use lsw_common::config::{ConfigError, LswConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = LswConfig::from_file(Path::new("lsw.toml"))?;
//!     println!("Debounce: {:?}", config.timing.debounce());
//!     Ok(())
//! }
//! ```

use crate::consts::{DEFAULT_CLOCK_HZ, DEFAULT_DEBOUNCE_MS, DEFAULT_LINE_BITS, DEFAULT_LINE_NAMES};
use crate::packet::LineMask;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields shared by both binaries.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "lsw-sampler"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "lsw".to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sampler timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Hardware counter rate in Hz.
    pub clock_hz: u64,
    /// Debounce dead-time after each publish, in milliseconds.
    pub debounce_ms: u64,
    /// Counter cycles charged per poll by a virtual-time simulator.
    ///
    /// Wall-clock runs (the `lsw_sampler` binary) read time from the host
    /// clock and ignore this field. Must be > 0 or virtual time never moves.
    pub poll_cycles: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            clock_hz: DEFAULT_CLOCK_HZ,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll_cycles: 4,
        }
    }
}

impl TimingConfig {
    /// Debounce dead-time as a duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// One monitored input line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Input register bit (0..31).
    pub bit: u8,
    /// Display name.
    pub name: String,
}

fn default_lines() -> Vec<LineConfig> {
    DEFAULT_LINE_BITS
        .iter()
        .zip(DEFAULT_LINE_NAMES)
        .map(|(&bit, name)| LineConfig {
            bit,
            name: name.to_string(),
        })
        .collect()
}

/// Host-side read contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Interval between two reads of the readiness word, in milliseconds.
    pub poll_interval_ms: u64,
    /// Warn when no fresh sample arrived for this long, in milliseconds.
    pub stale_after_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            stale_after_ms: 10_000,
        }
    }
}

impl HostConfig {
    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Staleness threshold as a duration.
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

/// A scripted assertion of one or more lines in the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Start, in milliseconds after the sampler starts.
    pub at_ms: u64,
    /// How long the lines stay asserted, in milliseconds.
    pub hold_ms: u64,
    /// Asserted input register bits.
    pub bits: Vec<u8>,
}

/// Simulated board used when no co-processor is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Initial raw counter value. Values close to `u32::MAX` force an early wrap.
    pub start_count: u32,
    /// Cycles between a wrap and the sibling's counter update.
    pub relay_lag_cycles: u64,
    /// Scripted line assertions.
    pub pulses: Vec<PulseConfig>,
}

/// Complete workspace configuration.
///
/// # TOML Example
///
/// ```toml
/// [timing]
/// debounce_ms = 60
///
/// [[lines]]
/// bit = 8
/// name = "Actuator 1 Cold"
///
/// [host]
/// poll_interval_ms = 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LswConfig {
    /// Common fields.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Sampler timing.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Monitored lines.
    #[serde(default = "default_lines")]
    pub lines: Vec<LineConfig>,
    /// Host read contract.
    #[serde(default)]
    pub host: HostConfig,
    /// Simulated board.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for LswConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            timing: TimingConfig::default(),
            lines: default_lines(),
            host: HostConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl LswConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Mask of all monitored lines.
    pub fn line_mask(&self) -> LineMask {
        let bits: Vec<u8> = self.lines.iter().map(|l| l.bit).collect();
        LineMask::from_line_bits(&bits)
    }

    /// Display name of a line, if monitored.
    pub fn line_name(&self, bit: u8) -> Option<&str> {
        self.lines
            .iter()
            .find(|l| l.bit == bit)
            .map(|l| l.name.as_str())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `shared.service_name` is empty
    /// - `timing.clock_hz` is zero
    /// - no lines are configured, a line bit is >= 32, or a bit is repeated
    /// - `host.poll_interval_ms` is zero
    /// - a simulated pulse has zero length or drives an unmonitored bit
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.timing.clock_hz == 0 {
            return Err(ConfigError::ValidationError(
                "timing.clock_hz must be > 0".to_string(),
            ));
        }

        if self.timing.poll_cycles == 0 {
            return Err(ConfigError::ValidationError(
                "timing.poll_cycles must be > 0".to_string(),
            ));
        }

        if self.lines.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one line must be configured".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for line in &self.lines {
            if line.bit >= 32 {
                return Err(ConfigError::ValidationError(format!(
                    "line '{}' uses bit {} (max 31)",
                    line.name, line.bit
                )));
            }
            if !seen.insert(line.bit) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate line bit: {}",
                    line.bit
                )));
            }
        }

        if self.host.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "host.poll_interval_ms must be > 0".to_string(),
            ));
        }

        let mask = self.line_mask();
        for pulse in &self.simulation.pulses {
            if pulse.hold_ms == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "pulse at {}ms has zero hold time",
                    pulse.at_ms
                )));
            }
            let pulse_mask = LineMask::from_line_bits(&pulse.bits);
            if pulse.bits.is_empty()
                || pulse.bits.iter().any(|&b| b >= 32)
                || !mask.contains(pulse_mask)
            {
                return Err(ConfigError::ValidationError(format!(
                    "pulse at {}ms drives unmonitored bits {:?}",
                    pulse.at_ms, pulse.bits
                )));
            }
        }

        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct TestWrapper {
            level: LogLevel,
        }

        for (text, level) in [
            ("trace", LogLevel::Trace),
            ("debug", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("warn", LogLevel::Warn),
            ("error", LogLevel::Error),
        ] {
            let parsed: TestWrapper = toml::from_str(&format!("level = \"{text}\"")).unwrap();
            assert_eq!(parsed.level, level);
        }
    }

    #[test]
    fn test_log_level_to_tracing() {
        assert_eq!(tracing::Level::from(LogLevel::Warn), tracing::Level::WARN);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = LswConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.line_mask(), LineMask::ACTUATOR_LIMITS);
        assert_eq!(config.line_name(8), Some("Actuator 1 Cold"));
        assert_eq!(config.line_name(0), None);
        assert_eq!(config.timing.debounce(), Duration::from_millis(60));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = LswConfig::from_toml("").unwrap();
        assert_eq!(config.shared.service_name, "lsw");
        assert_eq!(config.timing.clock_hz, 200_000_000);
        assert_eq!(config.lines.len(), 6);
        assert_eq!(config.host.poll_interval(), Duration::from_millis(10));
    }

    #[test]
    fn test_rejects_zero_clock() {
        let result = LswConfig::from_toml("[timing]\nclock_hz = 0\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_rejects_duplicate_line() {
        let toml = r#"
[[lines]]
bit = 3
name = "a"

[[lines]]
bit = 3
name = "b"
"#;
        let result = LswConfig::from_toml(toml);
        assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("duplicate")));
    }

    #[test]
    fn test_rejects_out_of_range_line() {
        let toml = "[[lines]]\nbit = 32\nname = \"x\"\n";
        assert!(matches!(
            LswConfig::from_toml(toml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_pulse_on_unmonitored_bit() {
        let toml = r#"
[[simulation.pulses]]
at_ms = 10
hold_ms = 5
bits = [0]
"#;
        assert!(matches!(
            LswConfig::from_toml(toml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_zero_hold_pulse() {
        let toml = r#"
[[simulation.pulses]]
at_ms = 10
hold_ms = 0
bits = [8]
"#;
        assert!(matches!(
            LswConfig::from_toml(toml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        assert!(matches!(
            LswConfig::from_toml("[host]\npoll_interval_ms = 0\n"),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
