//! Per-rate latency statistics

use std::collections::BTreeMap;

use crate::constants::{BITS_PER_FRAME, NANOS_PER_SECOND};
use crate::error::{LatencyError, LatencyResult};
use crate::interface::BaudRate;

/// Serialization time of one 8N1 frame at `baud`, the floor for a round trip
pub fn ideal_ns(baud: BaudRate) -> LatencyResult<u64> {
    if baud == 0 {
        return Err(LatencyError::Configuration(
            "Baud rate must be greater than zero".to_string(),
        ));
    }
    Ok(NANOS_PER_SECOND * BITS_PER_FRAME / baud as u64)
}

/// Everything collected while probing a rate that could be opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub min_ns: u64,
    pub max_ns: u64,
    /// Truncated mean
    pub avg_ns: u64,
    pub timed_out: bool,
    pub has_errors: bool,
    /// Round trip of every byte, in transmission order
    pub samples: Vec<u64>,
}

impl Measurement {
    /// Aggregate a finished sample series. `None` for an empty series.
    pub fn from_samples(samples: Vec<u64>, timed_out: bool, has_errors: bool) -> Option<Self> {
        let min_ns = *samples.iter().min()?;
        let max_ns = *samples.iter().max()?;
        let sum: u128 = samples.iter().map(|&s| s as u128).sum();
        let avg_ns = (sum / samples.len() as u128) as u64;

        Some(Measurement {
            min_ns,
            max_ns,
            avg_ns,
            timed_out,
            has_errors,
            samples,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateResult {
    pub baud: BaudRate,
    pub ideal_ns: u64,
    /// `None` when the port could not be opened at this rate
    pub measurement: Option<Measurement>,
}

impl RateResult {
    pub fn unsupported(baud: BaudRate, ideal_ns: u64) -> Self {
        RateResult {
            baud,
            ideal_ns,
            measurement: None,
        }
    }

    pub fn supported(&self) -> bool {
        self.measurement.is_some()
    }

    /// Average minus ideal
    pub fn delta_ns(&self) -> Option<i64> {
        self.measurement
            .as_ref()
            .map(|m| m.avg_ns as i64 - self.ideal_ns as i64)
    }

    pub fn samples(&self) -> Option<&[u64]> {
        self.measurement.as_ref().map(|m| m.samples.as_slice())
    }
}

/// Results of a whole sweep, keyed and iterated in ascending rate order
pub type SweepResult = BTreeMap<BaudRate, RateResult>;
