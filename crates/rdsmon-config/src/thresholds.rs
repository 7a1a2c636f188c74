use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A warn/alert threshold pair for one numeric check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub warn: f64,
    pub alert: f64,
}

impl ThresholdPair {
    /// Invariant for higher-is-worse metrics: alert must sit strictly
    /// above warn.
    fn validate_ascending(self, check: &'static str) -> Result<Self> {
        if self.alert <= self.warn {
            return Err(ConfigError::InvertedPair {
                check,
                warn: self.warn,
                alert: self.alert,
            });
        }
        Ok(self)
    }

    /// Invariant for lower-is-worse metrics: alert must sit strictly
    /// below warn.
    fn validate_descending(self, check: &'static str) -> Result<Self> {
        if self.alert >= self.warn {
            return Err(ConfigError::InvertedPair {
                check,
                warn: self.warn,
                alert: self.alert,
            });
        }
        Ok(self)
    }
}

/// Immutable per-run threshold set for the four numeric checks.
///
/// Units: CPU and free storage in percent, latencies in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub cpu_pct: ThresholdPair,
    /// Lower is worse: alert below warn.
    pub free_storage_pct: ThresholdPair,
    pub read_latency_ms: ThresholdPair,
    pub write_latency_ms: ThresholdPair,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_pct: ThresholdPair {
                warn: 80.0,
                alert: 90.0,
            },
            free_storage_pct: ThresholdPair {
                warn: 20.0,
                alert: 10.0,
            },
            read_latency_ms: ThresholdPair {
                warn: 200.0,
                alert: 300.0,
            },
            write_latency_ms: ThresholdPair {
                warn: 200.0,
                alert: 300.0,
            },
        }
    }
}

impl Thresholds {
    /// Parse thresholds from an environment map, falling back to the
    /// defaults for unset keys and validating every pair.
    pub fn from_map(env: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();
        let cpu_pct = ThresholdPair {
            warn: parse_f64(env, "CPU_WARN", defaults.cpu_pct.warn)?,
            alert: parse_f64(env, "CPU_ALERT", defaults.cpu_pct.alert)?,
        }
        .validate_ascending("cpu")?;
        let free_storage_pct = ThresholdPair {
            warn: parse_f64(env, "FREE_PCT_WARN", defaults.free_storage_pct.warn)?,
            alert: parse_f64(env, "FREE_PCT_ALERT", defaults.free_storage_pct.alert)?,
        }
        .validate_descending("free_storage")?;
        let read_latency_ms = ThresholdPair {
            warn: parse_f64(env, "READ_LAT_WARN", defaults.read_latency_ms.warn)?,
            alert: parse_f64(env, "READ_LAT_ALERT", defaults.read_latency_ms.alert)?,
        }
        .validate_ascending("read_latency")?;
        let write_latency_ms = ThresholdPair {
            warn: parse_f64(env, "WRITE_LAT_WARN", defaults.write_latency_ms.warn)?,
            alert: parse_f64(env, "WRITE_LAT_ALERT", defaults.write_latency_ms.alert)?,
        }
        .validate_ascending("write_latency")?;

        Ok(Self {
            cpu_pct,
            free_storage_pct,
            read_latency_ms,
            write_latency_ms,
        })
    }
}

pub(crate) fn parse_f64(env: &HashMap<String, String>, key: &str, default: f64) -> Result<f64> {
    match env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse::<f64>().map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

pub(crate) fn parse_u64(env: &HashMap<String, String>, key: &str, default: u64) -> Result<u64> {
    match env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}
