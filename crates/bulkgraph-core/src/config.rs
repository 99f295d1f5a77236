//! Load configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default rows per transfer round trip.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default per-transfer timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Settings applied to every bulk transfer of a load.
///
/// Deserializes from a map where every key is optional; `timeout_secs` is a
/// whole number of seconds and `0` disables the limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Rows per transfer round trip. Must be at least 1.
    pub batch_size: usize,
    /// Per-transfer timeout; zero means no limit.
    #[serde(rename = "timeout_secs", with = "duration_secs")]
    pub timeout: Duration,
    /// Stream rows to the sink as they are produced.
    pub streaming: bool,
    /// Include columns the database assigns on insert.
    pub include_generated_columns: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            streaming: false,
            include_generated_columns: false,
        }
    }
}

impl LoadConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn batch_size(mut self, rows: usize) -> Self {
        self.batch_size = rows;
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Remove the per-transfer time limit.
    #[must_use]
    pub const fn no_timeout(mut self) -> Self {
        self.timeout = Duration::ZERO;
        self
    }

    #[must_use]
    pub const fn streaming(mut self, value: bool) -> Self {
        self.streaming = value;
        self
    }

    #[must_use]
    pub const fn include_generated_columns(mut self, value: bool) -> Self {
        self.include_generated_columns = value;
        self
    }

    /// Check the configuration before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError {
                field: "batch_size",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
