//! Byte-by-byte round trip timing for a single baud rate.
//!
//! Each sample is the wall-clock time between handing one byte to the
//! channel and getting its echo back (or giving up after the response
//! timeout). Timeouts and mismatched echoes are recorded as flags on the
//! result; they never stop the run.

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::clock::Clock;
use crate::constants::{DEFAULT_RESPONSE_TIMEOUT_MS, DEFAULT_SAMPLE_COUNT};
use crate::error::{LatencyError, LatencyResult};
use crate::interface::{BaudRate, EchoChannel};
use crate::stats::{Measurement, RateResult, ideal_ns};

/// Which byte is transmitted at a given sample index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BytePattern {
    /// `index mod 256`, so every byte value goes over the wire
    #[default]
    Cycle,

    /// The same byte every time
    Fixed(u8),
}

impl BytePattern {
    pub fn byte_at(&self, index: usize) -> u8 {
        match self {
            BytePattern::Cycle => (index % 256) as u8,
            BytePattern::Fixed(byte) => *byte,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    sample_count: usize,
    response_timeout: Duration,
    pattern: BytePattern,
}

impl ProbeConfig {
    pub fn new(
        sample_count: usize,
        response_timeout: Duration,
        pattern: BytePattern,
    ) -> LatencyResult<Self> {
        if sample_count == 0 {
            return Err(LatencyError::Configuration(
                "Sample count must be at least 1".to_string(),
            ));
        }
        if response_timeout.is_zero() {
            return Err(LatencyError::Configuration(
                "Response timeout must be greater than zero".to_string(),
            ));
        }

        Ok(ProbeConfig {
            sample_count,
            response_timeout,
            pattern,
        })
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn pattern(&self) -> BytePattern {
        self.pattern
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            sample_count: DEFAULT_SAMPLE_COUNT,
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            pattern: BytePattern::Cycle,
        }
    }
}

pub struct LatencyProbe<C> {
    clock: C,
    config: ProbeConfig,
}

impl<C: Clock> LatencyProbe<C> {
    pub fn new(clock: C, config: ProbeConfig) -> Self {
        LatencyProbe { clock, config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Measure `sample_count` round trips on an already opened and drained channel
    pub fn run<E>(&self, channel: &mut E, baud: BaudRate) -> LatencyResult<RateResult>
    where
        E: EchoChannel + ?Sized,
    {
        self.run_with_progress(channel, baud, &mut |_| {})
    }

    /// Same as [`LatencyProbe::run`], calling `on_sample` with the index of
    /// every sample once it has been recorded
    pub fn run_with_progress<E>(
        &self,
        channel: &mut E,
        baud: BaudRate,
        on_sample: &mut dyn FnMut(usize),
    ) -> LatencyResult<RateResult>
    where
        E: EchoChannel + ?Sized,
    {
        let ideal_ns = ideal_ns(baud)?;
        let timeout = self.config.response_timeout;
        let sample_count = self.config.sample_count;

        let mut samples = Vec::with_capacity(sample_count);
        let mut timed_out = false;
        let mut has_errors = false;
        let mut transport_failure_logged = false;

        for index in 0..sample_count {
            let sent = self.config.pattern.byte_at(index);
            let start = self.clock.now_ns();

            if let Err(e) = channel.send_byte(sent) {
                if !transport_failure_logged {
                    warn!("Failed to send sample {} at {} baud: {}", index, baud, e);
                    transport_failure_logged = true;
                }
                has_errors = true;
            }

            match channel.receive_byte(timeout) {
                Ok(Some(received)) if received == sent => {}
                Ok(Some(received)) => {
                    trace!(
                        "Sample {}: sent {:#04x}, received {:#04x}",
                        index, sent, received
                    );
                    has_errors = true;
                }
                Ok(None) => {
                    // Is the loopback installed?
                    trace!("Sample {}: no echo within {:?}", index, timeout);
                    timed_out = true;
                }
                Err(e) => {
                    if !transport_failure_logged {
                        warn!("Failed to read sample {} at {} baud: {}", index, baud, e);
                        transport_failure_logged = true;
                    }
                    has_errors = true;
                }
            }

            let sample = self.clock.now_ns().saturating_sub(start);
            samples.push(sample);
            on_sample(index);
        }

        let measurement = Measurement::from_samples(samples, timed_out, has_errors).ok_or_else(
            || LatencyError::Configuration("Sample count must be at least 1".to_string()),
        )?;
        debug!(
            "{} baud: min {} ns, avg {} ns, max {} ns",
            baud, measurement.min_ns, measurement.avg_ns, measurement.max_ns
        );

        Ok(RateResult {
            baud,
            ideal_ns,
            measurement: Some(measurement),
        })
    }
}
