//! Acquisition settings.
//!
//! Every field has a default matching the reference firmware (115200 baud,
//! 8N1, 2 s boot settle), so `AcquisitionConfig::default()` is usable as is.
//! [`AcquisitionConfig::load`] layers an optional TOML file and
//! `VIBRAWATCH_*` environment variables on top of those defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::Result;

/// Environment variable prefix for overrides (`VIBRAWATCH_BUFFER_CAPACITY=500`).
pub const ENV_PREFIX: &str = "VIBRAWATCH";

/// Fixed serial framing: 8 data bits, no parity, 1 stop bit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSettings {
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self { baud_rate: 115_200, read_timeout_ms: 1_000 }
    }
}

impl LineSettings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub line: LineSettings,
    /// Records held before the oldest is dropped
    pub buffer_capacity: usize,
    /// Wait after opening the port while the device boots
    pub settle_delay_ms: u64,
    /// Wait before reading the device greeting line
    pub greeting_delay_ms: u64,
    /// Sleep between polls when no line is waiting
    pub idle_delay_ms: u64,
    /// Sleep after a transport read fault
    pub fault_backoff_ms: u64,
    /// Bound on joining the acquisition worker
    pub stop_timeout_ms: u64,
    /// Case-insensitive substrings identifying the device during auto-detection
    pub vendor_signatures: Vec<String>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            line: LineSettings::default(),
            buffer_capacity: 1_000,
            settle_delay_ms: 2_000,
            greeting_delay_ms: 500,
            idle_delay_ms: 1,
            fault_backoff_ms: 100,
            stop_timeout_ms: 2_000,
            vendor_signatures: vec!["arduino".to_string(), "usb".to_string()],
        }
    }
}

impl AcquisitionConfig {
    /// Load configuration from an optional TOML file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn greeting_delay(&self) -> Duration {
        Duration::from_millis(self.greeting_delay_ms)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    pub fn fault_backoff(&self) -> Duration {
        Duration::from_millis(self.fault_backoff_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Settings with no boot or greeting waits, for scripted transports
    pub fn without_delays(mut self) -> Self {
        self.settle_delay_ms = 0;
        self.greeting_delay_ms = 0;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_firmware() {
        let config = AcquisitionConfig::default();
        assert_eq!(config.line.baud_rate, 115_200);
        assert_eq!(config.line.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.buffer_capacity, 1_000);
        assert_eq!(config.settle_delay(), Duration::from_secs(2));
        assert_eq!(config.stop_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let config = AcquisitionConfig::load(None).expect("defaults load");
        assert_eq!(config.line, LineSettings::default());
        assert!(!config.vendor_signatures.is_empty());
    }

    #[test]
    fn load_merges_partial_file() {
        let path = std::env::temp_dir().join(format!("vibrawatch-config-{}.toml", std::process::id()));
        {
            let mut file = std::fs::File::create(&path).expect("create temp config");
            writeln!(file, "buffer_capacity = 250").expect("write");
            writeln!(file, "[line]").expect("write");
            writeln!(file, "baud_rate = 9600").expect("write");
        }

        let config = AcquisitionConfig::load(Some(&path)).expect("config loads");
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.buffer_capacity, 250);
        assert_eq!(config.line.baud_rate, 9600);
        assert_eq!(config.line.read_timeout_ms, 1_000);
        assert_eq!(config.settle_delay_ms, 2_000);
    }

    #[test]
    fn without_delays_zeroes_boot_waits() {
        let config = AcquisitionConfig::default().without_delays();
        assert_eq!(config.settle_delay(), Duration::ZERO);
        assert_eq!(config.greeting_delay(), Duration::ZERO);
        assert_eq!(config.stop_timeout(), Duration::from_secs(2));
    }
}
